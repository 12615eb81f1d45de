use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tracing::{debug, error};

use crate::config::DatabaseConfig;
use crate::errors::AppError;

/// Handle to the single connection a provisioning or seeding run works
/// through. Built once per run and closed explicitly at the end of it.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = config.connect_options()?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                AppError::Connection(e)
            })?;

        debug!(tls = config.requires_tls(), "Database connection established");
        Ok(Self { pool })
    }

    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, AppError> {
        self.pool.acquire().await.map_err(AppError::Connection)
    }

    /// Waits for the checked-out connection to come back, then shuts the pool down.
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Database connection closed");
    }
}
