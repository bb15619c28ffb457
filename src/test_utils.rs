use crate::application::DEFAULT_STORE_TIMEOUT;
use crate::application::commands::{CreateRoleCommand, MergePermissionsCommand};
use crate::application::queries::RoleReadModel;
use crate::domain::permission_group::{NewPermissionItem, PermissionGroup};
use crate::infrastructure::{
    InMemoryPermissionGroupRepository, InMemoryRoleRepository, InMemoryUserRepository,
};
use crate::interface::app_state::AppState;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

/// Application state over in-memory stores, with the concrete stores kept
/// around so tests can seed them or count lookups.
pub struct TestContext {
    pub state: Arc<AppState>,
    pub group_repo: Arc<InMemoryPermissionGroupRepository>,
    pub role_repo: Arc<InMemoryRoleRepository>,
    pub user_repo: Arc<InMemoryUserRepository>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_STORE_TIMEOUT)
    }

    pub fn with_timeout(store_timeout: Duration) -> Self {
        let group_repo = Arc::new(InMemoryPermissionGroupRepository::new());
        let role_repo = Arc::new(InMemoryRoleRepository::new());
        let user_repo = Arc::new(InMemoryUserRepository::default());
        let state = Arc::new(AppState::new(
            group_repo.clone(),
            role_repo.clone(),
            user_repo.clone(),
            store_timeout,
        ));
        Self {
            state,
            group_repo,
            role_repo,
            user_repo,
        }
    }

    /// The `/api` router over this context's state.
    pub fn router(&self) -> Router {
        crate::interface::api_router(self.state.clone())
    }

    /// Merges plain names into a group and returns the stored group.
    pub async fn seed_group(&self, group_name: &str, names: &[&str]) -> PermissionGroup {
        self.state
            .permission_groups
            .merge_insert(MergePermissionsCommand {
                group_name: group_name.to_string(),
                items: names
                    .iter()
                    .map(|name| NewPermissionItem::new(*name, None))
                    .collect(),
            })
            .await
            .expect("seed permission group")
            .group
    }

    pub async fn seed_role(&self, name: &str, permissions: Vec<String>) -> RoleReadModel {
        self.state
            .roles
            .create(CreateRoleCommand {
                name: name.to_string(),
                permissions,
            })
            .await
            .expect("seed role")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Item id of the item called `name` in `group`.
pub fn item_id(group: &PermissionGroup, name: &str) -> String {
    group
        .items
        .iter()
        .find(|item| item.name == name)
        .map(|item| item.id.clone())
        .unwrap_or_else(|| panic!("no item {name} in group {}", group.group_name))
}
