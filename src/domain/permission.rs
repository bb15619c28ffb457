use crate::domain::permission_group::PermissionItem;
use serde::{Deserialize, Serialize};

/// Flattened view of a permission item together with the name of its group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPermission {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub group: String,
}

impl ResolvedPermission {
    /// Creates a resolved permission from an item and the group that owns it.
    pub fn from_item(item: &PermissionItem, group_name: &str) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            group: group_name.to_string(),
        }
    }
}
