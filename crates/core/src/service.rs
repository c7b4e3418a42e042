//! The record service facade.
//!
//! [`RecordService`] is the stable operation set callers program against. It
//! says nothing about how snapshots are persisted; implementations translate
//! their storage errors into [`CoreError`].

use async_trait::async_trait;

use crate::context::OpContext;
use crate::error::CoreError;
use crate::record::{FieldChanges, Record, RecordData};
use crate::types::{RecordId, VersionNumber};

/// Result of [`RecordService::upsert_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was unknown and version 1 was written.
    Created(Record),
    /// A new version was appended to an existing record.
    Updated(Record),
}

impl UpsertOutcome {
    pub fn record(&self) -> &Record {
        match self {
            Self::Created(r) | Self::Updated(r) => r,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            Self::Created(r) | Self::Updated(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Typed operations over versioned records.
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Fetch the highest version of a record.
    async fn get_record(&self, ctx: &OpContext, id: RecordId) -> Result<Record, CoreError>;

    /// Fetch one exact version of a record.
    async fn get_record_version(
        &self,
        ctx: &OpContext,
        id: RecordId,
        version: VersionNumber,
    ) -> Result<Record, CoreError>;

    /// Write version 1 of a new record and return it.
    async fn create_record(
        &self,
        ctx: &OpContext,
        id: RecordId,
        data: RecordData,
    ) -> Result<Record, CoreError>;

    /// Apply field changes to the latest version and return the new version.
    async fn update_record(
        &self,
        ctx: &OpContext,
        id: RecordId,
        changes: &FieldChanges,
    ) -> Result<Record, CoreError>;

    /// All version numbers of a record, ascending.
    async fn list_versions(
        &self,
        ctx: &OpContext,
        id: RecordId,
    ) -> Result<Vec<VersionNumber>, CoreError>;

    /// Create the record from `changes` if the id is unknown, otherwise
    /// append a new version with `changes` applied.
    ///
    /// If another writer creates the record between the lookup and the
    /// create, the changes are applied on top of its version instead.
    async fn upsert_record(
        &self,
        ctx: &OpContext,
        id: RecordId,
        changes: &FieldChanges,
    ) -> Result<UpsertOutcome, CoreError> {
        match self.get_record(ctx, id).await {
            Ok(_) => self
                .update_record(ctx, id, changes)
                .await
                .map(UpsertOutcome::Updated),
            Err(CoreError::NotFound { .. }) => {
                match self.create_record(ctx, id, changes.initial_data()).await {
                    Ok(record) => Ok(UpsertOutcome::Created(record)),
                    Err(CoreError::AlreadyExists { .. }) => self
                        .update_record(ctx, id, changes)
                        .await
                        .map(UpsertOutcome::Updated),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::record::validate_record_id;

    /// Minimal in-memory service used to exercise the provided methods.
    #[derive(Default)]
    struct MemoryService {
        rows: Mutex<BTreeMap<RecordId, Vec<Record>>>,
        /// Pretend another writer created the record right before our create.
        lose_create_race: bool,
    }

    #[async_trait]
    impl RecordService for MemoryService {
        async fn get_record(&self, _ctx: &OpContext, id: RecordId) -> Result<Record, CoreError> {
            let rows = self.rows.lock().unwrap();
            rows.get(&id)
                .and_then(|versions| versions.last().cloned())
                .ok_or(CoreError::NotFound { id })
        }

        async fn get_record_version(
            &self,
            _ctx: &OpContext,
            id: RecordId,
            version: VersionNumber,
        ) -> Result<Record, CoreError> {
            let rows = self.rows.lock().unwrap();
            rows.get(&id)
                .and_then(|versions| versions.iter().find(|r| r.version == version).cloned())
                .ok_or(CoreError::VersionNotFound { id, version })
        }

        async fn create_record(
            &self,
            _ctx: &OpContext,
            id: RecordId,
            data: RecordData,
        ) -> Result<Record, CoreError> {
            validate_record_id(id)?;
            let mut rows = self.rows.lock().unwrap();
            if self.lose_create_race {
                rows.entry(id)
                    .or_default()
                    .push(Record::initial(id, RecordData::new(), Utc::now()));
                return Err(CoreError::AlreadyExists { id });
            }
            if rows.contains_key(&id) {
                return Err(CoreError::AlreadyExists { id });
            }
            let record = Record::initial(id, data, Utc::now());
            rows.insert(id, vec![record.clone()]);
            Ok(record)
        }

        async fn update_record(
            &self,
            _ctx: &OpContext,
            id: RecordId,
            changes: &FieldChanges,
        ) -> Result<Record, CoreError> {
            let mut rows = self.rows.lock().unwrap();
            let versions = rows.get_mut(&id).ok_or(CoreError::NotFound { id })?;
            let next = versions
                .last()
                .ok_or(CoreError::NotFound { id })?
                .successor(changes, Utc::now());
            versions.push(next.clone());
            Ok(next)
        }

        async fn list_versions(
            &self,
            _ctx: &OpContext,
            id: RecordId,
        ) -> Result<Vec<VersionNumber>, CoreError> {
            let rows = self.rows.lock().unwrap();
            rows.get(&id)
                .map(|versions| versions.iter().map(|r| r.version).collect())
                .ok_or(CoreError::NotFound { id })
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_unknown_record_without_deletes() {
        let svc = MemoryService::default();
        let ctx = OpContext::background();
        let changes = FieldChanges::new().set("name", "Jane").delete("email");

        let outcome = svc.upsert_record(&ctx, 2, &changes).await.unwrap();

        assert!(outcome.is_created());
        let record = outcome.into_record();
        assert_eq!(record.version, 1);
        assert_eq!(record.data.get("name").map(String::as_str), Some("Jane"));
        assert!(!record.data.contains_key("email"));
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_record() {
        let svc = MemoryService::default();
        let ctx = OpContext::background();
        svc.upsert_record(&ctx, 1, &FieldChanges::new().set("a", "1"))
            .await
            .unwrap();

        let outcome = svc
            .upsert_record(&ctx, 1, &FieldChanges::new().delete("a").set("b", "2"))
            .await
            .unwrap();

        assert_matches!(&outcome, UpsertOutcome::Updated(r) if r.version == 2);
        assert_eq!(outcome.record().data.len(), 1);
        assert_eq!(svc.list_versions(&ctx, 1).await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_upsert_falls_back_to_update_after_losing_create_race() {
        let svc = MemoryService {
            lose_create_race: true,
            ..Default::default()
        };
        let ctx = OpContext::background();

        let outcome = svc
            .upsert_record(&ctx, 5, &FieldChanges::new().set("k", "v"))
            .await
            .unwrap();

        assert_matches!(outcome, UpsertOutcome::Updated(ref r) if r.version == 2);
    }

    #[tokio::test]
    async fn test_upsert_propagates_invalid_id() {
        let svc = MemoryService::default();
        let ctx = OpContext::background();

        let result = svc.upsert_record(&ctx, 0, &FieldChanges::new()).await;

        assert_matches!(result, Err(CoreError::InvalidId(0)));
    }
}
