use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single permission owned by a group. The id is assigned once on insertion
/// and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Incoming permission item that has not been given an id yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPermissionItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPermissionItem {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }

    fn into_item(self) -> PermissionItem {
        PermissionItem {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            description: self.description,
        }
    }
}

/// Errors raised while mutating the items of a group in memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("Permission {item_id} not found in group {group_id}")]
    ItemNotFound { group_id: String, item_id: String },
    #[error("Group {group_name} already has a permission named {name}")]
    DuplicateName { group_name: String, name: String },
}

/// PermissionGroup aggregate: a uniquely named collection of permission items.
///
/// Item names are unique within one group. A group never exists without items;
/// callers delete it once [`PermissionGroup::is_empty`] turns true.
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionGroup {
    pub id: String,
    pub group_name: String,
    pub items: Vec<PermissionItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionGroup {
    /// Creates a new group, assigning a fresh id to every incoming item.
    pub fn new(group_name: String, items: Vec<NewPermissionItem>) -> Self {
        let now = Utc::now();
        let mut group = Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_name,
            items: Vec::with_capacity(items.len()),
            created_at: now,
            updated_at: now,
        };
        group.merge_items(items);
        group
    }

    /// Appends the incoming items whose name is not already taken in this group.
    ///
    /// Existing items keep their id and description. Returns the number of
    /// items actually appended.
    pub fn merge_items(&mut self, incoming: Vec<NewPermissionItem>) -> usize {
        let before = self.items.len();
        for item in incoming {
            if !self.has_item_named(&item.name) {
                self.items.push(item.into_item());
            }
        }
        let appended = self.items.len() - before;
        if appended > 0 {
            self.touch();
        }
        appended
    }

    /// Replaces name and description of an item in place.
    pub fn update_item(
        &mut self,
        item_id: &str,
        name: String,
        description: Option<String>,
    ) -> Result<&PermissionItem, GroupError> {
        let index = self.position_of(item_id)?;
        if self
            .items
            .iter()
            .any(|item| item.id != item_id && item.name == name)
        {
            return Err(GroupError::DuplicateName {
                group_name: self.group_name.clone(),
                name,
            });
        }

        self.touch();
        let item = &mut self.items[index];
        item.name = name;
        item.description = description;
        Ok(item)
    }

    /// Removes an item, keeping the order of the remaining ones.
    pub fn remove_item(&mut self, item_id: &str) -> Result<PermissionItem, GroupError> {
        let index = self.position_of(item_id)?;
        self.touch();
        Ok(self.items.remove(index))
    }

    pub fn has_item_named(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position_of(&self, item_id: &str) -> Result<usize, GroupError> {
        self.items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| GroupError::ItemNotFound {
                group_id: self.id.clone(),
                item_id: item_id.to_string(),
            })
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Result of merging items into a group by name.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    pub group: PermissionGroup,
    /// True when the group did not exist before the merge.
    pub created: bool,
}

/// Result of renaming or re-describing one item.
#[derive(Clone, Debug)]
pub struct ItemUpdate {
    pub group: PermissionGroup,
    pub item: PermissionItem,
}

/// Result of removing one item. `group` is `None` once the group was deleted.
#[derive(Clone, Debug)]
pub struct ItemRemoval {
    pub group_deleted: bool,
    pub group: Option<PermissionGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> NewPermissionItem {
        NewPermissionItem::new(name, None)
    }

    fn names(group: &PermissionGroup) -> Vec<&str> {
        group.items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_new_group_assigns_ids() {
        let group = PermissionGroup::new(
            "Billing".to_string(),
            vec![item("view"), NewPermissionItem::new("edit", Some("Edit invoices".into()))],
        );

        assert_eq!(group.group_name, "Billing");
        assert_eq!(names(&group), vec!["view", "edit"]);
        assert!(group.items.iter().all(|i| !i.id.is_empty()));
        assert_ne!(group.items[0].id, group.items[1].id);
        assert_eq!(group.items[1].description.as_deref(), Some("Edit invoices"));
    }

    #[test]
    fn test_new_group_collapses_duplicate_names() {
        let group = PermissionGroup::new("Ops".to_string(), vec![item("a"), item("a"), item("b")]);
        assert_eq!(names(&group), vec!["a", "b"]);
    }

    #[test]
    fn test_merge_keeps_existing_item_untouched() {
        let mut group = PermissionGroup::new(
            "Billing".to_string(),
            vec![NewPermissionItem::new("view", Some("original".into()))],
        );
        let view_id = group.items[0].id.clone();

        let appended = group.merge_items(vec![
            NewPermissionItem::new("view", Some("replacement".into())),
            item("edit"),
        ]);

        assert_eq!(appended, 1);
        assert_eq!(names(&group), vec!["view", "edit"]);
        assert_eq!(group.items[0].id, view_id);
        assert_eq!(group.items[0].description.as_deref(), Some("original"));
    }

    #[test]
    fn test_merge_is_case_sensitive() {
        let mut group = PermissionGroup::new("Billing".to_string(), vec![item("view")]);
        group.merge_items(vec![item("View")]);
        assert_eq!(names(&group), vec!["view", "View"]);
    }

    #[test]
    fn test_repeated_overlapping_merges_never_duplicate() {
        let mut group = PermissionGroup::new("Ops".to_string(), vec![item("a")]);
        let batches = [
            vec!["a", "b"],
            vec!["b", "c", "c"],
            vec!["a", "b", "c", "d"],
            vec!["d"],
        ];
        for batch in batches {
            group.merge_items(batch.into_iter().map(item).collect());
            let mut seen = std::collections::HashSet::new();
            assert!(group.items.iter().all(|i| seen.insert(i.name.clone())));
        }
        assert_eq!(names(&group), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_update_item_in_place() {
        let mut group = PermissionGroup::new("Billing".to_string(), vec![item("view")]);
        let id = group.items[0].id.clone();

        let updated = group
            .update_item(&id, "read".to_string(), Some("Read only".to_string()))
            .unwrap();

        assert_eq!(updated.id, id);
        assert_eq!(updated.name, "read");
        assert_eq!(updated.description.as_deref(), Some("Read only"));
    }

    #[test]
    fn test_update_item_rejects_name_taken_by_sibling() {
        let mut group = PermissionGroup::new("Billing".to_string(), vec![item("view"), item("edit")]);
        let edit_id = group.items[1].id.clone();

        let result = group.update_item(&edit_id, "view".to_string(), None);
        assert!(matches!(result, Err(GroupError::DuplicateName { .. })));

        // Keeping its own name is fine.
        assert!(group.update_item(&edit_id, "edit".to_string(), None).is_ok());
    }

    #[test]
    fn test_update_unknown_item() {
        let mut group = PermissionGroup::new("Billing".to_string(), vec![item("view")]);
        let result = group.update_item("missing", "x".to_string(), None);
        assert!(matches!(result, Err(GroupError::ItemNotFound { .. })));
    }

    #[test]
    fn test_remove_item_preserves_order_and_ids() {
        let mut group =
            PermissionGroup::new("Billing".to_string(), vec![item("a"), item("b"), item("c")]);
        let ids: Vec<String> = group.items.iter().map(|i| i.id.clone()).collect();

        let removed = group.remove_item(&ids[1]).unwrap();

        assert_eq!(removed.name, "b");
        let remaining: Vec<&str> = group.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(remaining, vec![ids[0].as_str(), ids[2].as_str()]);
        assert!(!group.is_empty());
    }

    #[test]
    fn test_remove_last_item_empties_group() {
        let mut group = PermissionGroup::new("Billing".to_string(), vec![item("a")]);
        let id = group.items[0].id.clone();
        group.remove_item(&id).unwrap();
        assert!(group.is_empty());
        assert!(!group.contains_item(&id));
    }
}
