use crate::application::commands::{
    DeletePermissionItemCommand, MergePermissionsCommand, UpdatePermissionItemCommand,
};
use crate::application::errors::ServiceError;
use crate::application::validators::{CommandValidator, PermissionCommandValidator};
use crate::application::{DEFAULT_STORE_TIMEOUT, within};
use crate::domain::permission::ResolvedPermission;
use crate::domain::permission_group::{ItemRemoval, ItemUpdate, MergeOutcome, PermissionGroup};
use crate::infrastructure::PermissionGroupRepository;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Owns permission groups and the items nested in them.
pub struct PermissionGroupService {
    group_repo: Arc<dyn PermissionGroupRepository>,
    validator: PermissionCommandValidator,
    timeout: Duration,
}

impl PermissionGroupService {
    pub fn new(group_repo: Arc<dyn PermissionGroupRepository>) -> Self {
        Self {
            group_repo,
            validator: PermissionCommandValidator,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full snapshot of every group, ordered by group name.
    #[instrument(name = "list_permission_groups", skip(self))]
    pub async fn list_all(&self) -> Result<Vec<PermissionGroup>, ServiceError> {
        within(self.timeout, self.group_repo.list_groups()).await
    }

    /// Merges items into a group by name; items whose name already exists in
    /// the group are left untouched.
    #[instrument(name = "merge_permissions", skip(self, command), fields(group = %command.group_name))]
    pub async fn merge_insert(
        &self,
        command: MergePermissionsCommand,
    ) -> Result<MergeOutcome, ServiceError> {
        self.validator.validate(&command)?;

        let outcome = within(
            self.timeout,
            self.group_repo
                .merge_items(&command.group_name, command.items),
        )
        .await?;

        info!(
            group_id = %outcome.group.id,
            created = outcome.created,
            items = outcome.group.items.len(),
            "Permission group merged"
        );
        Ok(outcome)
    }

    #[instrument(name = "update_permission_item", skip(self, command), fields(group_id = %command.group_id, item_id = %command.item_id))]
    pub async fn update_item(
        &self,
        command: UpdatePermissionItemCommand,
    ) -> Result<ItemUpdate, ServiceError> {
        self.validator.validate(&command)?;

        let update = within(
            self.timeout,
            self.group_repo.update_item(
                &command.group_id,
                &command.item_id,
                command.name,
                command.description,
            ),
        )
        .await?;

        info!("Permission item updated");
        Ok(update)
    }

    /// Deletes one item; the group goes with it when it was the last one.
    #[instrument(name = "delete_permission_item", skip(self, command), fields(group_id = %command.group_id, item_id = %command.item_id))]
    pub async fn delete_item(
        &self,
        command: DeletePermissionItemCommand,
    ) -> Result<ItemRemoval, ServiceError> {
        let removal = within(
            self.timeout,
            self.group_repo
                .delete_item(&command.group_id, &command.item_id),
        )
        .await?;

        info!(group_deleted = removal.group_deleted, "Permission item deleted");
        Ok(removal)
    }

    /// Resolves item ids to flattened permission records with one batched
    /// store query. Ids that match no live item are absent from the result.
    #[instrument(name = "resolve_permissions", skip(self, item_ids), fields(count = item_ids.len()))]
    pub async fn resolve_by_ids(
        &self,
        item_ids: &HashSet<String>,
    ) -> Result<HashMap<String, ResolvedPermission>, ServiceError> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<String> = item_ids.iter().cloned().collect();
        let groups = within(self.timeout, self.group_repo.find_by_item_ids(&ids)).await?;

        let resolved = groups
            .iter()
            .flat_map(|group| {
                group
                    .items
                    .iter()
                    .filter(|item| item_ids.contains(&item.id))
                    .map(|item| {
                        (
                            item.id.clone(),
                            ResolvedPermission::from_item(item, &group.group_name),
                        )
                    })
            })
            .collect();
        Ok(resolved)
    }
}
