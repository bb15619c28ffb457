use access_control_service::infrastructure::Database;
use access_control_service::interface::{
    CreateRoleRequest, CreateUserRequest, DeletePermissionResponse, ErrorResponse,
    MergePermissionsRequest, MessageResponse, NewPermissionRequest, PermissionGroupResponse,
    PermissionItemResponse, PermissionRefInput, ResolvedPermissionResponse,
    ResolvedUserResponse, RoleResponse, UpdatePermissionRequest, UpdatePermissionResponse,
    UpdateRoleRequest, UpdateUserRequest, UserResponse, api_router,
};
use access_control_service::{AppConfig, AppError, AppStateBuilder};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        access_control_service::interface::http_handlers::list_permission_groups_handler,
        access_control_service::interface::http_handlers::merge_permissions_handler,
        access_control_service::interface::http_handlers::update_permission_handler,
        access_control_service::interface::http_handlers::delete_permission_handler,
        access_control_service::interface::http_handlers::list_roles_handler,
        access_control_service::interface::http_handlers::create_role_handler,
        access_control_service::interface::http_handlers::update_role_handler,
        access_control_service::interface::http_handlers::delete_role_handler,
        access_control_service::interface::http_handlers::list_users_handler,
        access_control_service::interface::http_handlers::create_user_handler,
        access_control_service::interface::http_handlers::update_user_handler,
        access_control_service::interface::http_handlers::delete_user_handler,
    ),
    components(schemas(
        NewPermissionRequest, MergePermissionsRequest, UpdatePermissionRequest, PermissionItemResponse,
        PermissionGroupResponse, UpdatePermissionResponse, DeletePermissionResponse, PermissionRefInput,
        CreateRoleRequest, UpdateRoleRequest, ResolvedPermissionResponse, RoleResponse,
        CreateUserRequest, UpdateUserRequest, UserResponse, ResolvedUserResponse,
        MessageResponse, ErrorResponse
    )),
    tags(
        (name = "Permissions", description = "Permission groups and their permissions"),
        (name = "Roles", description = "Roles referencing permissions"),
        (name = "Users", description = "Users holding one role")
    )
)]
pub struct ApiDoc;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Store must be reachable before the server accepts requests
    let database = Database::connect(&config).await?;
    database.migrate().await?;

    let app_state = AppStateBuilder::new()
        .with_pool(database.pool().clone())
        .with_config(config.clone())
        .build()
        .await?;

    let app = api_router(app_state)
        .merge(SwaggerUi::new("/swagger").url("/openapi.json", ApiDoc::openapi()));

    let http_addr = config.http_address();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server running at http://{http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    Ok(())
}
