use crate::domain::permission_group::NewPermissionItem;
use crate::domain::user::UserPatch;

/// Command to merge permission items into a group, creating it if unseen
#[derive(Debug, Clone)]
pub struct MergePermissionsCommand {
    pub group_name: String,
    pub items: Vec<NewPermissionItem>,
}

/// Command to rename or re-describe one permission item
#[derive(Debug, Clone)]
pub struct UpdatePermissionItemCommand {
    pub group_id: String,
    pub item_id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Command to delete one permission item
#[derive(Debug, Clone)]
pub struct DeletePermissionItemCommand {
    pub group_id: String,
    pub item_id: String,
}

/// Command to create a role
#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub name: String,
    pub permissions: Vec<String>,
}

/// Command to replace a role's name and permission set
#[derive(Debug, Clone)]
pub struct UpdateRoleCommand {
    pub role_id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

/// Command to create a user
#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub name: String,
    pub email: String,
    pub role_id: String,
    pub status: Option<String>,
}

/// Command to patch a user
#[derive(Debug, Clone)]
pub struct UpdateUserCommand {
    pub user_id: String,
    pub patch: UserPatch,
}
