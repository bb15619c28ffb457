use crate::domain::permission_group::GroupError;
use crate::domain::role::Role;
use crate::domain::user::User;
use async_trait::async_trait;
use std::sync::Mutex;

// Infrastructure layer: database, connection lifecycle, repository adapters
pub mod database;
pub mod permission_group_repository;
pub mod role_repository;
pub mod user_repository;

pub use database::Database;
pub use permission_group_repository::{
    InMemoryPermissionGroupRepository, PermissionGroupRepository,
    PostgresPermissionGroupRepository,
};
pub use role_repository::PostgresRoleRepository;
pub use user_repository::{InMemoryUserRepository, PostgresUserRepository};

pub type RepoResult<T> = Result<T, StoreError>;

/// Store-level error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return StoreError::Conflict(format!("Unique constraint violated: {constraint}"));
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::Conflict(format!(
                    "Record is still referenced or references a missing record: {constraint}"
                ));
            }
        }
        StoreError::Database(err)
    }
}

impl From<GroupError> for StoreError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::ItemNotFound { item_id, .. } => StoreError::NotFound {
                entity: "permission",
                id: item_id,
            },
            duplicate @ GroupError::DuplicateName { .. } => {
                StoreError::Conflict(duplicate.to_string())
            }
        }
    }
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn list_roles(&self) -> RepoResult<Vec<Role>>;
    async fn find_by_id(&self, role_id: &str) -> RepoResult<Option<Role>>;
    async fn find_by_ids(&self, role_ids: &[String]) -> RepoResult<Vec<Role>>;
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
    async fn create_role(&self, role: Role) -> RepoResult<Role>;
    async fn update_role(&self, role: &Role) -> RepoResult<Role>;
    /// Returns false when no role had that id.
    async fn delete_role(&self, role_id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn find_by_id(&self, user_id: &str) -> RepoResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: User) -> RepoResult<User>;
    async fn update_user(&self, user: &User) -> RepoResult<User>;
    /// Returns false when no user had that id.
    async fn delete_user(&self, user_id: &str) -> RepoResult<bool>;
    async fn exists_with_role(&self, role_id: &str) -> RepoResult<bool>;
}

/// In-memory role store, insertion ordered. Enforces the same unique-name
/// rule as the `roles` table.
pub struct InMemoryRoleRepository {
    pub roles: Mutex<Vec<Role>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self {
            roles: Mutex::new(vec![]),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Role>> {
        self.roles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryRoleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        Ok(self.lock().clone())
    }

    async fn find_by_id(&self, role_id: &str) -> RepoResult<Option<Role>> {
        Ok(self.lock().iter().find(|r| r.id == role_id).cloned())
    }

    async fn find_by_ids(&self, role_ids: &[String]) -> RepoResult<Vec<Role>> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| role_ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        Ok(self.lock().iter().find(|r| r.name == name).cloned())
    }

    async fn create_role(&self, role: Role) -> RepoResult<Role> {
        let mut roles = self.lock();
        if roles.iter().any(|r| r.name == role.name || r.id == role.id) {
            return Err(StoreError::Conflict(format!(
                "Role {} already exists",
                role.name
            )));
        }
        roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, role: &Role) -> RepoResult<Role> {
        let mut roles = self.lock();
        if roles.iter().any(|r| r.name == role.name && r.id != role.id) {
            return Err(StoreError::Conflict(format!(
                "Role {} already exists",
                role.name
            )));
        }
        let stored = roles
            .iter_mut()
            .find(|r| r.id == role.id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "role",
                id: role.id.clone(),
            })?;
        *stored = role.clone();
        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: &str) -> RepoResult<bool> {
        let mut roles = self.lock();
        let before = roles.len();
        roles.retain(|r| r.id != role_id);
        Ok(roles.len() != before)
    }
}
