use std::sync::Arc;

use timetravel_core::context::OpContext;
use timetravel_core::service::RecordService;
use timetravel_db::{DbPool, SqliteRecordService, VersionedStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (used directly only for health checks).
    pub pool: DbPool,
    /// Record operations.
    pub records: Arc<dyn RecordService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the SQLite-backed record service onto `pool`.
    pub fn new(pool: DbPool, config: ServerConfig) -> Self {
        let store = VersionedStore::with_config(pool.clone(), config.store.clone());
        Self {
            pool,
            records: Arc::new(SqliteRecordService::new(store)),
            config: Arc::new(config),
        }
    }

    /// Context for one store operation, bounded by the configured timeout.
    pub fn op_context(&self) -> OpContext {
        OpContext::with_timeout(self.config.store_op_timeout())
    }
}
