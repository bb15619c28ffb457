use crate::application::commands::{
    CreateRoleCommand, CreateUserCommand, MergePermissionsCommand, UpdatePermissionItemCommand,
    UpdateRoleCommand, UpdateUserCommand,
};

/// A malformed field in an incoming command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Field validation failed: {field} - {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Base trait for command validation
pub trait CommandValidator<C> {
    fn validate(&self, command: &C) -> Result<(), ValidationError>;
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(
            field,
            format!("{field} cannot be empty"),
        ));
    }
    Ok(())
}

/// Permission command validation rules
pub struct PermissionCommandValidator;

impl PermissionCommandValidator {
    pub fn validate_group_name(group_name: &str) -> Result<(), ValidationError> {
        require_non_blank("group", group_name)
    }

    pub fn validate_item_name(name: &str) -> Result<(), ValidationError> {
        require_non_blank("name", name)
    }
}

impl CommandValidator<MergePermissionsCommand> for PermissionCommandValidator {
    fn validate(&self, command: &MergePermissionsCommand) -> Result<(), ValidationError> {
        Self::validate_group_name(&command.group_name)?;
        if command.items.is_empty() {
            return Err(ValidationError::new(
                "permissions",
                "At least one permission is required",
            ));
        }
        for item in &command.items {
            Self::validate_item_name(&item.name)?;
        }
        Ok(())
    }
}

impl CommandValidator<UpdatePermissionItemCommand> for PermissionCommandValidator {
    fn validate(&self, command: &UpdatePermissionItemCommand) -> Result<(), ValidationError> {
        Self::validate_item_name(&command.name)
    }
}

/// Role command validation rules
pub struct RoleCommandValidator;

impl RoleCommandValidator {
    pub fn validate_role_name(name: &str) -> Result<(), ValidationError> {
        require_non_blank("name", name)
    }

    /// Format-level check only: the id must look like a generated item id.
    /// Whether the item still exists is not checked.
    pub fn validate_permission_ref(permission_id: &str) -> Result<(), ValidationError> {
        uuid::Uuid::parse_str(permission_id).map_err(|_| {
            ValidationError::new(
                "permissions",
                format!("{permission_id} is not a valid permission id"),
            )
        })?;
        Ok(())
    }

    fn validate_role(name: &str, permissions: &[String]) -> Result<(), ValidationError> {
        Self::validate_role_name(name)?;
        permissions
            .iter()
            .try_for_each(|p| Self::validate_permission_ref(p))
    }
}

impl CommandValidator<CreateRoleCommand> for RoleCommandValidator {
    fn validate(&self, command: &CreateRoleCommand) -> Result<(), ValidationError> {
        Self::validate_role(&command.name, &command.permissions)
    }
}

impl CommandValidator<UpdateRoleCommand> for RoleCommandValidator {
    fn validate(&self, command: &UpdateRoleCommand) -> Result<(), ValidationError> {
        Self::validate_role(&command.name, &command.permissions)
    }
}

/// User command validation rules
pub struct UserCommandValidator;

impl UserCommandValidator {
    /// Validates email format
    pub fn validate_email(email: &str) -> Result<(), ValidationError> {
        if !email.contains('@') || !email.contains('.') {
            return Err(ValidationError::new("email", "Invalid email format"));
        }
        Ok(())
    }
}

impl CommandValidator<CreateUserCommand> for UserCommandValidator {
    fn validate(&self, command: &CreateUserCommand) -> Result<(), ValidationError> {
        require_non_blank("name", &command.name)?;
        Self::validate_email(&command.email)?;
        require_non_blank("role", &command.role_id)
    }
}

impl CommandValidator<UpdateUserCommand> for UserCommandValidator {
    fn validate(&self, command: &UpdateUserCommand) -> Result<(), ValidationError> {
        if let Some(name) = &command.patch.name {
            require_non_blank("name", name)?;
        }
        if let Some(email) = &command.patch.email {
            Self::validate_email(email)?;
        }
        if let Some(role_id) = &command.patch.role_id {
            require_non_blank("role", role_id)?;
        }
        Ok(())
    }
}
