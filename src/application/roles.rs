use crate::application::commands::{CreateRoleCommand, UpdateRoleCommand};
use crate::application::errors::ServiceError;
use crate::application::queries::RoleReadModel;
use crate::application::resolver::PermissionResolver;
use crate::application::validators::{CommandValidator, RoleCommandValidator};
use crate::application::{DEFAULT_STORE_TIMEOUT, within};
use crate::domain::role::Role;
use crate::infrastructure::{RoleRepository, UserRepository};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Role management. Reads come back with permission references resolved.
pub struct RoleDirectory {
    role_repo: Arc<dyn RoleRepository>,
    user_repo: Arc<dyn UserRepository>,
    resolver: PermissionResolver,
    validator: RoleCommandValidator,
    timeout: Duration,
}

impl RoleDirectory {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        user_repo: Arc<dyn UserRepository>,
        resolver: PermissionResolver,
    ) -> Self {
        Self {
            role_repo,
            user_repo,
            resolver,
            validator: RoleCommandValidator,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(name = "list_roles", skip(self))]
    pub async fn list(&self) -> Result<Vec<RoleReadModel>, ServiceError> {
        let roles = within(self.timeout, self.role_repo.list_roles()).await?;
        self.resolve_roles(roles).await
    }

    #[instrument(name = "create_role", skip(self, command), fields(name = %command.name))]
    pub async fn create(&self, command: CreateRoleCommand) -> Result<RoleReadModel, ServiceError> {
        self.validator.validate(&command)?;

        if within(self.timeout, self.role_repo.find_by_name(&command.name))
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Role {} already exists",
                command.name
            )));
        }

        let role = Role::new(command.name, command.permissions);
        let role = within(self.timeout, self.role_repo.create_role(role)).await?;
        info!(role_id = %role.id, permissions = role.permissions.len(), "Role created");
        self.resolve_role(role).await
    }

    /// Full replace of the role's name and permission references.
    #[instrument(name = "update_role", skip(self, command), fields(role_id = %command.role_id))]
    pub async fn update(&self, command: UpdateRoleCommand) -> Result<RoleReadModel, ServiceError> {
        self.validator.validate(&command)?;

        let mut role = within(self.timeout, self.role_repo.find_by_id(&command.role_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("role", &command.role_id))?;

        if let Some(other) =
            within(self.timeout, self.role_repo.find_by_name(&command.name)).await?
        {
            if other.id != role.id {
                return Err(ServiceError::Conflict(format!(
                    "Role {} already exists",
                    command.name
                )));
            }
        }

        role.replace(command.name, command.permissions);
        let role = within(self.timeout, self.role_repo.update_role(&role)).await?;
        info!("Role updated");
        self.resolve_role(role).await
    }

    /// Refuses while any user still holds the role. Unknown ids succeed.
    #[instrument(name = "delete_role", skip(self))]
    pub async fn delete(&self, role_id: &str) -> Result<(), ServiceError> {
        if within(self.timeout, self.user_repo.exists_with_role(role_id)).await? {
            warn!("Refusing to delete role assigned to users");
            return Err(ServiceError::Conflict(
                "Cannot delete role assigned to users".to_string(),
            ));
        }

        let deleted = within(self.timeout, self.role_repo.delete_role(role_id)).await?;
        info!(deleted, "Role delete processed");
        Ok(())
    }

    async fn resolve_role(&self, role: Role) -> Result<RoleReadModel, ServiceError> {
        let permissions = self.resolver.resolve(&role.permissions).await?;
        Ok(RoleReadModel::new(role, permissions))
    }

    /// Resolves the permissions of many roles with one lookup over the union
    /// of their references.
    pub(crate) async fn resolve_roles(
        &self,
        roles: Vec<Role>,
    ) -> Result<Vec<RoleReadModel>, ServiceError> {
        let ids: HashSet<String> = roles
            .iter()
            .flat_map(|role| role.permissions.iter().cloned())
            .collect();
        let map = self.resolver.lookup(&ids).await?;

        Ok(roles
            .into_iter()
            .map(|role| {
                let permissions = PermissionResolver::project(&role.permissions, &map);
                RoleReadModel::new(role, permissions)
            })
            .collect())
    }
}
