//! Persistence layer: SQLite pool, migrations, the record repository and the
//! versioned store built on top of it.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub mod error;
pub mod models;
pub mod repositories;
pub mod service;
pub mod store;

pub use error::StoreError;
pub use service::SqliteRecordService;
pub use store::{StoreConfig, VersionedStore};

pub type DbPool = sqlx::SqlitePool;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on open connections (default: `10`).
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing
    /// (default: 5 seconds).
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Create a connection pool from a database URL, creating the database file
/// if it does not exist yet.
pub async fn create_pool(database_url: &str, config: &PoolConfig) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
