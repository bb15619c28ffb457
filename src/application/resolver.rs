use crate::application::errors::ServiceError;
use crate::application::permission_groups::PermissionGroupService;
use crate::domain::permission::ResolvedPermission;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Item id to resolved permission, as returned by one batched lookup.
pub type PermissionMap = HashMap<String, ResolvedPermission>;

/// Turns opaque permission references into full permission records.
///
/// Callers collect every reference they need up front and resolve them with a
/// single [`lookup`](Self::lookup); the per-entity projection is then pure.
#[derive(Clone)]
pub struct PermissionResolver {
    groups: Arc<PermissionGroupService>,
}

impl PermissionResolver {
    pub fn new(groups: Arc<PermissionGroupService>) -> Self {
        Self { groups }
    }

    /// One store query for the whole id set, regardless of its size.
    pub async fn lookup(&self, ids: &HashSet<String>) -> Result<PermissionMap, ServiceError> {
        let map = self.groups.resolve_by_ids(ids).await?;
        debug!(requested = ids.len(), resolved = map.len(), "Resolved permission references");
        Ok(map)
    }

    /// Resolves one list of references, keeping the caller's order.
    pub async fn resolve(&self, refs: &[String]) -> Result<Vec<ResolvedPermission>, ServiceError> {
        let ids: HashSet<String> = refs.iter().cloned().collect();
        let map = self.lookup(&ids).await?;
        Ok(Self::project(refs, &map))
    }

    /// Maps references through an already-fetched lookup. References with no
    /// live item are dropped silently; the stored references stay as they are.
    pub fn project(refs: &[String], map: &PermissionMap) -> Vec<ResolvedPermission> {
        refs.iter().filter_map(|id| map.get(id).cloned()).collect()
    }
}
