use chrono::{DateTime, Utc};

/// Status given to users created without an explicit one.
pub const DEFAULT_STATUS: &str = "Active";

/// User aggregate: a person holding exactly one role.
///
/// `status` is an opaque label; no transitions are enforced here.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a user; `None` fields stay unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<String>,
    pub status: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role_id.is_none() && self.status.is_none()
    }
}

impl User {
    pub fn new(name: String, email: String, role_id: String, status: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            role_id,
            status: status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the fields present in the patch.
    pub fn apply(&mut self, patch: UserPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(role_id) = patch.role_id {
            self.role_id = role_id;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_id == role_id
    }
}
