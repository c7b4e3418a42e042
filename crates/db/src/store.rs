//! Append-only versioned persistence of record snapshots.
//!
//! Updates are a read-modify-write: read the latest snapshot, apply the field
//! changes, insert the result at `version + 1`. The `(id, version)` primary key
//! turns a lost race into a unique violation, which is retried from a fresh
//! read. No in-process locks are held across requests.
//!
//! Writes under an [`OpContext`] honour cancellation and the deadline up to
//! the insert, never during it. A write that reaches the database is always
//! reported, so a `Timeout` or `Cancelled` result means nothing was appended.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use timetravel_core::context::OpContext;
use timetravel_core::record::{FieldChanges, Record, RecordData};
use timetravel_core::types::{RecordId, VersionNumber};

use crate::error::{is_transient, is_unique_violation, is_write_conflict, StoreError};
use crate::models::record::RecordRow;
use crate::repositories::RecordRepo;
use crate::DbPool;

/// Retry policy for the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Attempts at appending a version before giving up with
    /// [`StoreError::WriteConflict`] (default: `10`).
    pub max_update_attempts: u32,
    /// Attempts per read when the failure is transient (default: `2`).
    pub read_attempts: u32,
    /// Base delay between attempts; grows linearly per attempt (default: 5ms).
    pub retry_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_update_attempts: 10,
            read_attempts: 2,
            retry_backoff: Duration::from_millis(5),
        }
    }
}

/// Versioned record store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct VersionedStore {
    pool: DbPool,
    config: StoreConfig,
}

impl VersionedStore {
    pub fn new(pool: DbPool) -> Self {
        Self::with_config(pool, StoreConfig::default())
    }

    pub fn with_config(pool: DbPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Return the highest version of `id`.
    pub async fn get_latest(&self, id: RecordId) -> Result<Record, StoreError> {
        let row = self
            .read(|| RecordRepo::find_latest(&self.pool, id))
            .await?
            .ok_or(StoreError::NotFound(id))?;
        Ok(row.decode()?)
    }

    /// Return the exact snapshot at `(id, version)`.
    pub async fn get_version(
        &self,
        id: RecordId,
        version: VersionNumber,
    ) -> Result<Record, StoreError> {
        let row = self
            .read(|| RecordRepo::find_by_version(&self.pool, id, version))
            .await?
            .ok_or(StoreError::VersionNotFound { id, version })?;
        Ok(row.decode()?)
    }

    /// Return every version number of `id`, ascending.
    pub async fn list_versions(&self, id: RecordId) -> Result<Vec<VersionNumber>, StoreError> {
        let versions = self
            .read(|| RecordRepo::list_versions(&self.pool, id))
            .await?;
        if versions.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        Ok(versions)
    }

    /// Write version 1 of a new record.
    pub async fn create(&self, id: RecordId, data: RecordData) -> Result<Record, StoreError> {
        self.create_within(&OpContext::background(), id, data).await
    }

    /// [`VersionedStore::create`] under `ctx`.
    pub async fn create_within(
        &self,
        ctx: &OpContext,
        id: RecordId,
        data: RecordData,
    ) -> Result<Record, StoreError> {
        if id <= 0 {
            return Err(StoreError::InvalidId(id));
        }

        let row = RecordRow::encode(&Record::initial(id, data, Utc::now()))?;
        ctx.check().map_err(StoreError::Aborted)?;
        match RecordRepo::insert(&self.pool, &row).await {
            Ok(inserted) => {
                tracing::info!(record_id = id, "Record created");
                Ok(inserted.decode()?)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `changes` to the latest version of `id` and append the result as
    /// a new version.
    ///
    /// Losing the insert to a concurrent writer re-reads and recomputes, up to
    /// [`StoreConfig::max_update_attempts`] times.
    pub async fn apply_update(
        &self,
        id: RecordId,
        changes: &FieldChanges,
    ) -> Result<Record, StoreError> {
        self.apply_update_within(&OpContext::background(), id, changes)
            .await
    }

    /// [`VersionedStore::apply_update`] under `ctx`.
    ///
    /// Reads and backoff sleeps are abandoned when `ctx` aborts. Each insert
    /// starts only if `ctx` is still live and then runs to completion.
    pub async fn apply_update_within(
        &self,
        ctx: &OpContext,
        id: RecordId,
        changes: &FieldChanges,
    ) -> Result<Record, StoreError> {
        let max_attempts = self.config.max_update_attempts.max(1);

        for attempt in 1..=max_attempts {
            let latest = ctx
                .race(self.get_latest(id))
                .await
                .map_err(StoreError::Aborted)??;
            let next = latest.successor(changes, Utc::now());
            let row = RecordRow::encode(&next)?;

            ctx.check().map_err(StoreError::Aborted)?;
            match RecordRepo::insert(&self.pool, &row).await {
                Ok(inserted) => {
                    tracing::info!(
                        record_id = id,
                        version = inserted.version,
                        attempt,
                        "Record version appended"
                    );
                    return Ok(inserted.decode()?);
                }
                Err(e) if is_write_conflict(&e) => {
                    tracing::debug!(
                        record_id = id,
                        version = next.version,
                        attempt,
                        error = %e,
                        "Version append lost a race"
                    );
                    if attempt < max_attempts {
                        ctx.race(tokio::time::sleep(self.config.retry_backoff * attempt))
                            .await
                            .map_err(StoreError::Aborted)?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            record_id = id,
            attempts = max_attempts,
            "Giving up on version append"
        );
        Err(StoreError::WriteConflict {
            id,
            attempts: max_attempts,
        })
    }

    /// Run a read, retrying transient connectivity failures.
    async fn read<T, F, Fut>(&self, mut op: F) -> Result<T, sqlx::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let max_attempts = self.config.read_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if attempt < max_attempts && is_transient(&e) => {
                    tracing::debug!(attempt, error = %e, "Transient read failure, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
