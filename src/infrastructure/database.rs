//! Postgres connection lifecycle.
//!
//! The pool is opened once before the HTTP server starts and closed after it
//! stops. Connecting fails fast: a bad URL or unreachable server aborts startup.

use crate::AppConfig;
use crate::infrastructure::StoreError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Owns the connection pool shared by all Postgres repositories.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Opens the pool and checks out one connection to prove the store is
    /// reachable.
    pub async fn connect(config: &AppConfig) -> Result<Self, StoreError> {
        info!(
            max_connections = config.db_max_connections,
            "Connecting to Postgres"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.store_timeout)
            .connect(&config.database_url)
            .await?;

        info!("Successfully connected to Postgres");
        Ok(Self { pool })
    }

    /// Wraps an existing pool, e.g. one created lazily by tests.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}
