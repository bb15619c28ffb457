// Interface layer: HTTP routes, handlers, DTOs

use crate::application::queries::{RoleReadModel, UserReadModel};
use crate::domain::permission::ResolvedPermission;
use crate::domain::permission_group::{PermissionGroup, PermissionItem};
use crate::domain::user::User;
use axum::Router;
use axum::routing::{get, put};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub mod app_state;
pub mod http_handlers;

pub use app_state::AppState;
pub use http_handlers::*;

// --- PERMISSION GROUPS ---

#[derive(Deserialize, ToSchema)]
pub struct NewPermissionRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct MergePermissionsRequest {
    pub group: String,
    pub permissions: Vec<NewPermissionRequest>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePermissionRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionItemResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<PermissionItem> for PermissionItemResponse {
    fn from(item: PermissionItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGroupResponse {
    pub id: String,
    pub group: String,
    pub permissions: Vec<PermissionItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PermissionGroup> for PermissionGroupResponse {
    fn from(group: PermissionGroup) -> Self {
        Self {
            id: group.id,
            group: group.group_name,
            permissions: group.items.into_iter().map(Into::into).collect(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionResponse {
    pub message: String,
    pub group: PermissionGroupResponse,
    pub updated_permission: PermissionItemResponse,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletePermissionResponse {
    pub message: String,
    pub deleted: bool,
    pub group_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<PermissionGroupResponse>,
}

// --- ROLES ---

/// A permission reference as sent by clients: a bare item id or `{ "id": ... }`.
#[derive(Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PermissionRefInput {
    Id(String),
    Object { id: String },
}

impl PermissionRefInput {
    pub fn into_id(self) -> String {
        match self {
            PermissionRefInput::Id(id) | PermissionRefInput::Object { id } => id,
        }
    }
}

pub(crate) fn permission_ids(refs: Vec<PermissionRefInput>) -> Vec<String> {
    refs.into_iter().map(PermissionRefInput::into_id).collect()
}

#[derive(Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionRefInput>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionRefInput>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolvedPermissionResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub group: String,
}

impl From<ResolvedPermission> for ResolvedPermissionResponse {
    fn from(permission: ResolvedPermission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            description: permission.description,
            group: permission.group,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub permissions: Vec<ResolvedPermissionResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RoleReadModel> for RoleResponse {
    fn from(role: RoleReadModel) -> Self {
        Self {
            id: role.id,
            name: role.name,
            permissions: role.permissions.into_iter().map(Into::into).collect(),
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

// --- USERS ---

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    /// Role id.
    pub role: String,
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Role id.
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role_id,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedUserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Option<RoleResponse>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserReadModel> for ResolvedUserResponse {
    fn from(user: UserReadModel) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.map(Into::into),
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// --- SHARED ---

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// All API routes under `/api`, bound to the given state.
pub fn api_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/permissions",
            get(list_permission_groups_handler).post(merge_permissions_handler),
        )
        .route(
            "/permissions/{group_id}/{item_id}",
            put(update_permission_handler).delete(delete_permission_handler),
        )
        .route("/roles", get(list_roles_handler).post(create_role_handler))
        .route(
            "/roles/{role_id}",
            put(update_role_handler).delete(delete_role_handler),
        )
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/{user_id}",
            put(update_user_handler).delete(delete_user_handler),
        );

    Router::new().nest("/api", api).with_state(state)
}
