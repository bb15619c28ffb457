use crate::domain::permission::ResolvedPermission;
use crate::domain::role::Role;
use crate::domain::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role read model with its permission references expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleReadModel {
    pub id: String,
    pub name: String,
    pub permissions: Vec<ResolvedPermission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleReadModel {
    pub fn new(role: Role, permissions: Vec<ResolvedPermission>) -> Self {
        Self {
            id: role.id,
            name: role.name,
            permissions,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

/// User read model with the role, and the role's permissions, expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReadModel {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: String,
    /// `None` only if the role vanished behind the store's back.
    pub role: Option<RoleReadModel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserReadModel {
    pub fn new(user: User, role: Option<RoleReadModel>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            status: user.status,
            role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
