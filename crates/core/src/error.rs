use crate::types::{RecordId, VersionNumber};

/// Boxed source error carried by [`CoreError::Storage`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Caller-facing error taxonomy for record operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid record id {0}: id must be a positive number")]
    InvalidId(RecordId),

    #[error("Record with id {id} does not exist")]
    NotFound { id: RecordId },

    #[error("Version {version} of record {id} not found")]
    VersionNotFound { id: RecordId, version: VersionNumber },

    #[error("Record with id {id} already exists")]
    AlreadyExists { id: RecordId },

    #[error("Storage failure: {message}")]
    Storage {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    Timeout,
}

impl CoreError {
    /// Wrap an underlying storage error with a short description of what failed.
    pub fn storage(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Storage {
            message: message.into(),
            source: source.into(),
        }
    }
}
