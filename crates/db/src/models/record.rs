//! Row model for the `records` table.

use sqlx::FromRow;
use timetravel_core::record::{Record, RecordData};
use timetravel_core::types::{RecordId, Timestamp, VersionNumber};

/// A row from the `records` table. `data` holds the JSON-encoded field map.
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub id: RecordId,
    pub version: VersionNumber,
    pub data: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RecordRow {
    /// Encode a snapshot for insertion.
    pub fn encode(record: &Record) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id,
            version: record.version,
            data: serde_json::to_string(&record.data)?,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Decode the stored row back into a snapshot.
    pub fn decode(self) -> Result<Record, serde_json::Error> {
        let data: RecordData = serde_json::from_str(&self.data)?;
        Ok(Record {
            id: self.id,
            version: self.version,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
