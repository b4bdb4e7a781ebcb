//! SQLite persistence for maintenance windows.
//!
//! The module is organized into submodules:
//! - `records` - row mapping between `maintenance_windows` and [`MaintenanceWindow`]
//! - `windows` - the [`WindowStore`](crate::store::WindowStore) implementation
//! - `retry` - bounded retry for transient SQLite errors
//!
//! [`MaintenanceWindow`]: crate::window::MaintenanceWindow

mod records;
pub mod retry;
mod windows;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{error, info};

use crate::config::StoreRetryConfig;

pub struct Database {
    pool: Pool<Sqlite>,
    retry: StoreRetryConfig,
}

impl Database {
    /// Expose pool for integration test queries
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str, retry: StoreRetryConfig) -> Result<Self> {
        info!("=== Starting database initialization ===");
        info!("Database path: {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                info!("Ensuring parent directory exists: {:?}", parent);
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!("FAILED to create parent directory {:?}: {}", parent, e);
                    return Err(e.into());
                }
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        info!("Connecting to database with URL: {}", database_url);

        let pool = match SqlitePool::connect(&database_url).await {
            Ok(pool) => {
                info!("Successfully connected to SQLite database");
                pool
            }
            Err(e) => {
                error!("FAILED to connect to database: {}", e);
                error!("   Database path: {}", database_path);
                return Err(e.into());
            }
        };

        let database = Self { pool, retry };
        database.initialize_tables().await?;

        info!("=== Database initialization completed successfully ===");
        Ok(database)
    }

    /// Private in-memory database; a single connection keeps every query on
    /// the same memory store.
    pub async fn in_memory() -> Result<Self> {
        Self::in_memory_with_retry(StoreRetryConfig::default()).await
    }

    pub async fn in_memory_with_retry(retry: StoreRetryConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let database = Self { pool, retry };
        database.initialize_tables().await?;
        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        info!("Step 1: Creating maintenance_windows table...");
        let windows_table_sql = r#"
            CREATE TABLE IF NOT EXISTS maintenance_windows (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL DEFAULT '',
                start_time DATETIME NOT NULL,
                end_time DATETIME NOT NULL,
                switches TEXT NOT NULL DEFAULT '[]',
                interfaces TEXT NOT NULL DEFAULT '[]',
                links TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL,
                inserted_at DATETIME,
                updated_at DATETIME
            )
        "#;

        if let Err(e) = sqlx::query(windows_table_sql).execute(&self.pool).await {
            error!("FAILED to create maintenance_windows table: {}", e);
            error!("SQL was: {}", windows_table_sql);
            return Err(e.into());
        }
        info!("maintenance_windows table created");

        info!("Step 2: Creating maintenance_windows index...");
        let status_index_sql = "CREATE INDEX IF NOT EXISTS idx_maintenance_windows_status ON maintenance_windows(status, start_time)";
        if let Err(e) = sqlx::query(status_index_sql).execute(&self.pool).await {
            error!("FAILED to create maintenance_windows status index: {}", e);
            return Err(e.into());
        }
        info!("maintenance_windows index created");

        Ok(())
    }
}
