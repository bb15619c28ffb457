use crate::application::{
    PermissionGroupService, PermissionResolver, RoleDirectory, UserDirectory,
};
use crate::infrastructure::{PermissionGroupRepository, RoleRepository, UserRepository};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub permission_groups: Arc<PermissionGroupService>,
    pub resolver: PermissionResolver,
    pub roles: Arc<RoleDirectory>,
    pub users: Arc<UserDirectory>,
}

impl AppState {
    /// Wires the services over the given repositories, bounding every store
    /// round trip by `store_timeout`.
    pub fn new(
        group_repo: Arc<dyn PermissionGroupRepository>,
        role_repo: Arc<dyn RoleRepository>,
        user_repo: Arc<dyn UserRepository>,
        store_timeout: Duration,
    ) -> Self {
        let permission_groups =
            Arc::new(PermissionGroupService::new(group_repo).with_timeout(store_timeout));
        let resolver = PermissionResolver::new(permission_groups.clone());
        let roles = Arc::new(
            RoleDirectory::new(role_repo.clone(), user_repo.clone(), resolver.clone())
                .with_timeout(store_timeout),
        );
        let users = Arc::new(
            UserDirectory::new(user_repo, role_repo, roles.clone()).with_timeout(store_timeout),
        );

        Self {
            permission_groups,
            resolver,
            roles,
            users,
        }
    }
}
