/// Logical record identifier, shared by every version of a record.
pub type RecordId = i64;

/// Per-record version number. Versions start at 1 and are dense.
pub type VersionNumber = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
