//! Store-level errors and classification of raw SQLite failures.

use timetravel_core::error::CoreError;
use timetravel_core::types::{RecordId, VersionNumber};

/// SQLite primary result codes for lock contention.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// SQLite extended result codes for a duplicate key.
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

/// Errors raised by [`crate::VersionedStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record id must be positive, got {0}")]
    InvalidId(RecordId),

    #[error("record {0} does not exist")]
    NotFound(RecordId),

    #[error("version {version} of record {id} not found")]
    VersionNotFound { id: RecordId, version: VersionNumber },

    #[error("record {0} already exists")]
    AlreadyExists(RecordId),

    /// Every attempt to append a version lost the race to another writer.
    #[error("gave up appending a version to record {id} after {attempts} conflicting attempts")]
    WriteConflict { id: RecordId, attempts: u32 },

    #[error("failed to encode or decode record data: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The caller's context was cancelled or expired before the insert ran.
    #[error(transparent)]
    Aborted(CoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(id) => CoreError::InvalidId(id),
            StoreError::NotFound(id) => CoreError::NotFound { id },
            StoreError::VersionNotFound { id, version } => {
                CoreError::VersionNotFound { id, version }
            }
            StoreError::AlreadyExists(id) => CoreError::AlreadyExists { id },
            err @ StoreError::WriteConflict { .. } => {
                CoreError::storage("concurrent update conflict", err)
            }
            StoreError::Encoding(e) => CoreError::storage("record data encoding failed", e),
            StoreError::Database(e) => CoreError::storage("database operation failed", e),
            StoreError::Aborted(e) => e,
        }
    }
}

/// Whether `err` is a duplicate `(id, version)` key.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                || matches!(
                    db_err.code().as_deref(),
                    Some(SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE)
                )
        }
        _ => false,
    }
}

/// Whether `err` is lock contention that outlasted the busy timeout.
pub fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    }
}

/// Whether a write lost a race and may succeed if recomputed and retried.
pub fn is_write_conflict(err: &sqlx::Error) -> bool {
    is_unique_violation(err) || is_busy(err)
}

/// Whether a read failed for connectivity reasons worth one more try.
pub fn is_transient(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) || is_busy(err)
}
