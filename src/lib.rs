pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod test_utils;

use application::DEFAULT_STORE_TIMEOUT;
use infrastructure::{
    PermissionGroupRepository, PostgresPermissionGroupRepository, PostgresRoleRepository,
    PostgresUserRepository, RoleRepository, StoreError, UserRepository,
};
use interface::AppState;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: &str = "8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Application configuration read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub http_host: String,
    pub http_port: String,
    pub db_max_connections: u32,
    /// Bound applied to every store round trip.
    pub store_timeout: Duration,
}

impl AppConfig {
    /// Creates a new AppConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `DATABASE_URL` is
    /// required; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("DATABASE_URL".to_string()))?;

        let http_host = lookup("HTTP_HOST").unwrap_or_else(|| DEFAULT_HTTP_HOST.to_string());
        let http_port = lookup("HTTP_PORT").unwrap_or_else(|| DEFAULT_HTTP_PORT.to_string());
        http_port
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid(format!("HTTP_PORT must be a port, got {http_port}")))?;

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ConfigError::Invalid(format!("DB_MAX_CONNECTIONS must be a positive integer, got {raw}"))
            })?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let store_timeout = match lookup("STORE_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "STORE_TIMEOUT_MS must be a positive number of milliseconds, got {raw}"
                    ))
                })?,
            None => DEFAULT_STORE_TIMEOUT,
        };

        Ok(AppConfig {
            database_url,
            http_host,
            http_port,
            db_max_connections,
            store_timeout,
        })
    }

    /// Creates an AppConfig with default pool size and timeout (useful for testing)
    pub fn new(database_url: String, http_host: String, http_port: String) -> Self {
        Self {
            database_url,
            http_host,
            http_port,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Creates the HTTP address string from host and port
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// APPLICATION BUILDER
// ============================================================================

/// Builder for the Postgres-backed application state
#[derive(Debug, Default)]
pub struct AppStateBuilder {
    pool: Option<PgPool>,
    config: Option<AppConfig>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database pool
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the configuration
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the application state
    pub async fn build(self) -> Result<Arc<AppState>, AppError> {
        let pool = self.pool.ok_or(AppError::MissingPool)?;
        let store_timeout = self
            .config
            .as_ref()
            .map_or(DEFAULT_STORE_TIMEOUT, |config| config.store_timeout);

        let group_repo = Arc::new(PostgresPermissionGroupRepository::new(pool.clone()))
            as Arc<dyn PermissionGroupRepository>;
        let role_repo =
            Arc::new(PostgresRoleRepository::new(pool.clone())) as Arc<dyn RoleRepository>;
        let user_repo = Arc::new(PostgresUserRepository::new(pool)) as Arc<dyn UserRepository>;

        Ok(Arc::new(AppState::new(
            group_repo,
            role_repo,
            user_repo,
            store_timeout,
        )))
    }
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Startup and shutdown failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing database pool")]
    MissingPool,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}
