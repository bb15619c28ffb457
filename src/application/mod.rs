// Application layer: permission store, reference resolution, directories
use crate::infrastructure::RepoResult;
use std::future::Future;
use std::time::Duration;

pub mod commands;
pub mod errors;
pub mod permission_groups;
pub mod queries;
pub mod resolver;
pub mod roles;
pub mod users;
pub mod validators;

pub use errors::ServiceError;
pub use permission_groups::PermissionGroupService;
pub use resolver::{PermissionMap, PermissionResolver};
pub use roles::RoleDirectory;
pub use users::UserDirectory;

/// Upper bound for one store round trip unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one store call, failing with [`ServiceError::StoreTimeout`] if it does
/// not complete within `limit`. Dropping the call on timeout leaves the store
/// untouched because every mutation commits atomically or not at all.
pub(crate) async fn within<T, F>(limit: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = RepoResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => Err(ServiceError::StoreTimeout(limit)),
    }
}
