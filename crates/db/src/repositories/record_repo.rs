//! Repository for the `records` table.
//!
//! Rows are immutable snapshots keyed by `(id, version)`. There is no update
//! or delete here; the table's triggers reject both.

use timetravel_core::types::{RecordId, VersionNumber};

use crate::models::record::RecordRow;
use crate::DbPool;

/// Column list for records queries.
const COLUMNS: &str = "id, version, data, created_at, updated_at";

/// Provides read and append operations for record snapshots.
pub struct RecordRepo;

impl RecordRepo {
    /// Insert one snapshot row. Fails with a unique violation if the
    /// `(id, version)` pair is already taken.
    pub async fn insert(pool: &DbPool, row: &RecordRow) -> Result<RecordRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO records (id, version, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RecordRow>(&query)
            .bind(row.id)
            .bind(row.version)
            .bind(&row.data)
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Find the highest version of a record.
    pub async fn find_latest(
        pool: &DbPool,
        id: RecordId,
    ) -> Result<Option<RecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM records
             WHERE id = ?
             ORDER BY version DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, RecordRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a specific version of a record.
    pub async fn find_by_version(
        pool: &DbPool,
        id: RecordId,
        version: VersionNumber,
    ) -> Result<Option<RecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM records
             WHERE id = ? AND version = ?"
        );
        sqlx::query_as::<_, RecordRow>(&query)
            .bind(id)
            .bind(version)
            .fetch_optional(pool)
            .await
    }

    /// List every version number of a record, oldest first. Empty if the
    /// record does not exist.
    pub async fn list_versions(
        pool: &DbPool,
        id: RecordId,
    ) -> Result<Vec<VersionNumber>, sqlx::Error> {
        let rows: Vec<(VersionNumber,)> =
            sqlx::query_as("SELECT version FROM records WHERE id = ? ORDER BY version ASC")
                .bind(id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }
}
