use crate::application::commands::{CreateUserCommand, UpdateUserCommand};
use crate::application::errors::ServiceError;
use crate::application::queries::{RoleReadModel, UserReadModel};
use crate::application::roles::RoleDirectory;
use crate::application::validators::{CommandValidator, UserCommandValidator};
use crate::application::{DEFAULT_STORE_TIMEOUT, within};
use crate::domain::user::User;
use crate::infrastructure::{RoleRepository, UserRepository};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// User management. Listing expands each user's role and its permissions.
pub struct UserDirectory {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    roles: Arc<RoleDirectory>,
    validator: UserCommandValidator,
    timeout: Duration,
}

impl UserDirectory {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        roles: Arc<RoleDirectory>,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            roles,
            validator: UserCommandValidator,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Users with roles and permissions expanded. The permission lookup is a
    /// single batched query across every user's role.
    #[instrument(name = "list_users", skip(self))]
    pub async fn list(&self) -> Result<Vec<UserReadModel>, ServiceError> {
        let users = within(self.timeout, self.user_repo.list_users()).await?;

        let role_ids: Vec<String> = users
            .iter()
            .map(|u| u.role_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let roles = within(self.timeout, self.role_repo.find_by_ids(&role_ids)).await?;

        let resolved: HashMap<String, RoleReadModel> = self
            .roles
            .resolve_roles(roles)
            .await?
            .into_iter()
            .map(|role| (role.id.clone(), role))
            .collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let role = resolved.get(&user.role_id).cloned();
                if role.is_none() {
                    warn!(user_id = %user.id, role_id = %user.role_id, "User references a missing role");
                }
                UserReadModel::new(user, role)
            })
            .collect())
    }

    #[instrument(name = "create_user", skip(self, command), fields(email = %command.email))]
    pub async fn create(&self, command: CreateUserCommand) -> Result<User, ServiceError> {
        self.validator.validate(&command)?;
        self.ensure_role_exists(&command.role_id).await?;
        self.ensure_email_free(&command.email, None).await?;

        let user = User::new(command.name, command.email, command.role_id, command.status);
        let user = within(self.timeout, self.user_repo.create_user(user)).await?;
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Applies the fields present in the patch; a new role must exist.
    #[instrument(name = "update_user", skip(self, command), fields(user_id = %command.user_id))]
    pub async fn update(&self, command: UpdateUserCommand) -> Result<User, ServiceError> {
        self.validator.validate(&command)?;

        let mut user = within(self.timeout, self.user_repo.find_by_id(&command.user_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("user", &command.user_id))?;

        if let Some(role_id) = &command.patch.role_id {
            self.ensure_role_exists(role_id).await?;
        }
        if let Some(email) = &command.patch.email {
            self.ensure_email_free(email, Some(&user.id)).await?;
        }

        user.apply(command.patch);
        let user = within(self.timeout, self.user_repo.update_user(&user)).await?;
        info!("User updated");
        Ok(user)
    }

    /// Unknown ids succeed.
    #[instrument(name = "delete_user", skip(self))]
    pub async fn delete(&self, user_id: &str) -> Result<(), ServiceError> {
        let deleted = within(self.timeout, self.user_repo.delete_user(user_id)).await?;
        info!(deleted, "User delete processed");
        Ok(())
    }

    async fn ensure_role_exists(&self, role_id: &str) -> Result<(), ServiceError> {
        within(self.timeout, self.role_repo.find_by_id(role_id))
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("role", role_id))
    }

    async fn ensure_email_free(
        &self,
        email: &str,
        except_user: Option<&str>,
    ) -> Result<(), ServiceError> {
        match within(self.timeout, self.user_repo.find_by_email(email)).await? {
            Some(existing) if Some(existing.id.as_str()) != except_user => Err(
                ServiceError::Conflict(format!("User with email {email} already exists")),
            ),
            _ => Ok(()),
        }
    }
}
