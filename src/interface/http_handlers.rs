use crate::application::ServiceError;
use crate::application::validators::ValidationError;
use crate::application::commands::{
    CreateRoleCommand, CreateUserCommand, DeletePermissionItemCommand, MergePermissionsCommand,
    UpdatePermissionItemCommand, UpdateRoleCommand, UpdateUserCommand,
};
use crate::domain::permission_group::NewPermissionItem;
use crate::domain::user::UserPatch;
use crate::interface::app_state::AppState;
use crate::interface::{
    CreateRoleRequest, CreateUserRequest, DeletePermissionResponse, ErrorResponse,
    MergePermissionsRequest, MessageResponse, PermissionGroupResponse, ResolvedUserResponse,
    RoleResponse, UpdatePermissionRequest, UpdatePermissionResponse, UpdateRoleRequest,
    UpdateUserRequest, UserResponse, permission_ids,
};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::error;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::StoreTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// JSON request body. Malformed or mistyped bodies are rejected as
/// validation errors with the usual `{error}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::Validation(ValidationError::new("body", rejection.body_text()))
    }
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

// --- PERMISSION HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/api/permissions",
    responses(
        (status = 200, description = "All permission groups", body = [PermissionGroupResponse]),
        (status = 504, description = "Store timed out", body = ErrorResponse),
    ),
    tags = ["Permissions"],
    description = "List every permission group with its permissions."
)]
pub async fn list_permission_groups_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PermissionGroupResponse>>, ServiceError> {
    let groups = state.permission_groups.list_all().await?;
    Ok(Json(groups.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/api/permissions",
    request_body = MergePermissionsRequest,
    responses(
        (status = 201, description = "Permission group created", body = PermissionGroupResponse),
        (status = 200, description = "Permissions merged into existing group", body = PermissionGroupResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    ),
    tags = ["Permissions"],
    description = "Add permissions to a group, creating the group if needed. Names already present in the group are skipped."
)]
pub async fn merge_permissions_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<MergePermissionsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let command = MergePermissionsCommand {
        group_name: payload.group,
        items: payload
            .permissions
            .into_iter()
            .map(|p| NewPermissionItem::new(p.name, p.description))
            .collect(),
    };

    let outcome = state.permission_groups.merge_insert(command).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(PermissionGroupResponse::from(outcome.group))))
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/api/permissions/{group_id}/{item_id}",
    request_body = UpdatePermissionRequest,
    params(
        ("group_id" = String, Path, description = "Permission group id"),
        ("item_id" = String, Path, description = "Permission id"),
    ),
    responses(
        (status = 200, description = "Permission updated", body = UpdatePermissionResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Group or permission not found", body = ErrorResponse),
        (status = 409, description = "Name already used in the group", body = ErrorResponse),
    ),
    tags = ["Permissions"],
    description = "Rename or re-describe one permission. Its id is kept."
)]
pub async fn update_permission_handler(
    State(state): State<Arc<AppState>>,
    Path((group_id, item_id)): Path<(String, String)>,
    JsonBody(payload): JsonBody<UpdatePermissionRequest>,
) -> Result<Json<UpdatePermissionResponse>, ServiceError> {
    let update = state
        .permission_groups
        .update_item(UpdatePermissionItemCommand {
            group_id,
            item_id,
            name: payload.name,
            description: payload.description,
        })
        .await?;

    Ok(Json(UpdatePermissionResponse {
        message: "Permission updated successfully".to_string(),
        group: update.group.into(),
        updated_permission: update.item.into(),
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/api/permissions/{group_id}/{item_id}",
    params(
        ("group_id" = String, Path, description = "Permission group id"),
        ("item_id" = String, Path, description = "Permission id"),
    ),
    responses(
        (status = 200, description = "Permission deleted", body = DeletePermissionResponse),
        (status = 404, description = "Group or permission not found", body = ErrorResponse),
    ),
    tags = ["Permissions"],
    description = "Delete one permission. The group is deleted with its last permission."
)]
pub async fn delete_permission_handler(
    State(state): State<Arc<AppState>>,
    Path((group_id, item_id)): Path<(String, String)>,
) -> Result<Json<DeletePermissionResponse>, ServiceError> {
    let removal = state
        .permission_groups
        .delete_item(DeletePermissionItemCommand { group_id, item_id })
        .await?;

    let message = if removal.group_deleted {
        "Permission group deleted as no permissions remain"
    } else {
        "Permission deleted successfully"
    };
    Ok(Json(DeletePermissionResponse {
        message: message.to_string(),
        deleted: true,
        group_deleted: removal.group_deleted,
        group: removal.group.map(Into::into),
    }))
}

// --- ROLE HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "All roles with resolved permissions", body = [RoleResponse]),
    ),
    tags = ["Roles"],
    description = "List roles. Permissions that no longer exist are left out."
)]
pub async fn list_roles_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoleResponse>>, ServiceError> {
    let roles = state.roles.list().await?;
    Ok(Json(roles.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Role name already exists", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Create a role from a name and a list of permission ids."
)]
pub async fn create_role_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<CreateRoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let role = state
        .roles
        .create(CreateRoleCommand {
            name: payload.name,
            permissions: permission_ids(payload.permissions),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/api/roles/{role_id}",
    request_body = UpdateRoleRequest,
    params(("role_id" = String, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Role name already exists", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Replace a role's name and permissions."
)]
pub async fn update_role_handler(
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>, ServiceError> {
    let role = state
        .roles
        .update(UpdateRoleCommand {
            role_id,
            name: payload.name,
            permissions: permission_ids(payload.permissions),
        })
        .await?;
    Ok(Json(role.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/api/roles/{role_id}",
    params(("role_id" = String, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 409, description = "Role still assigned to users", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Delete a role that no user holds."
)]
pub async fn delete_role_handler(
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.roles.delete(&role_id).await?;
    Ok(message("Role deleted"))
}

// --- USER HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users with roles and permissions resolved", body = [ResolvedUserResponse]),
    ),
    tags = ["Users"],
    description = "List users with their role and the role's permissions."
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ResolvedUserResponse>>, ServiceError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Create a user holding an existing role."
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .users
        .create(CreateUserCommand {
            name: payload.name,
            email: payload.email,
            role_id: payload.role,
            status: payload.status,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    request_body = UpdateUserRequest,
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User or role not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Update the given fields of a user."
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    let user = state
        .users
        .update(UpdateUserCommand {
            user_id,
            patch: UserPatch {
                name: payload.name,
                email: payload.email,
                role_id: payload.role,
                status: payload.status,
            },
        })
        .await?;
    Ok(Json(user.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
    ),
    tags = ["Users"],
    description = "Delete a user."
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.users.delete(&user_id).await?;
    Ok(message("User deleted"))
}
