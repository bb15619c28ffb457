use chrono::{DateTime, Utc};

/// Role entity: a named, ordered set of permission item ids.
///
/// The ids are weak references into the permission groups. They may outlive
/// the items they point at; resolution simply skips such ids.
#[derive(Clone, Debug, PartialEq)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>, // permission item IDs
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: String, permissions: Vec<String>) -> Self {
        let now = Utc::now();
        let mut role = Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        role.set_permissions(permissions);
        role
    }

    /// Adds a permission to the role (if not already present).
    pub fn add_permission(&mut self, permission_id: String) {
        if !self.permissions.contains(&permission_id) {
            self.permissions.push(permission_id);
        }
    }

    /// Replaces the whole permission set, collapsing duplicates and keeping
    /// first occurrences in order.
    pub fn set_permissions(&mut self, permissions: Vec<String>) {
        self.permissions.clear();
        for permission_id in permissions {
            self.add_permission(permission_id);
        }
    }

    /// Full replace of name and permissions.
    pub fn replace(&mut self, name: String, permissions: Vec<String>) {
        self.name = name;
        self.set_permissions(permissions);
        self.updated_at = Utc::now();
    }
}
