//! [`RecordService`] backed by the SQLite [`VersionedStore`].

use async_trait::async_trait;
use timetravel_core::context::OpContext;
use timetravel_core::error::CoreError;
use timetravel_core::record::{FieldChanges, Record, RecordData};
use timetravel_core::service::RecordService;
use timetravel_core::types::{RecordId, VersionNumber};

use crate::store::VersionedStore;

/// Delegates every operation to the store under the caller's [`OpContext`]
/// and maps store errors into [`CoreError`].
///
/// Reads are raced against the context. Writes pass it down so the store can
/// stop before an insert but never abandon one in flight.
#[derive(Debug, Clone)]
pub struct SqliteRecordService {
    store: VersionedStore,
}

impl SqliteRecordService {
    pub fn new(store: VersionedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &VersionedStore {
        &self.store
    }
}

#[async_trait]
impl RecordService for SqliteRecordService {
    async fn get_record(&self, ctx: &OpContext, id: RecordId) -> Result<Record, CoreError> {
        ctx.run(async { self.store.get_latest(id).await.map_err(CoreError::from) })
            .await
    }

    async fn get_record_version(
        &self,
        ctx: &OpContext,
        id: RecordId,
        version: VersionNumber,
    ) -> Result<Record, CoreError> {
        ctx.run(async { self.store.get_version(id, version).await.map_err(CoreError::from) })
            .await
    }

    async fn create_record(
        &self,
        ctx: &OpContext,
        id: RecordId,
        data: RecordData,
    ) -> Result<Record, CoreError> {
        self.store
            .create_within(ctx, id, data)
            .await
            .map_err(CoreError::from)
    }

    async fn update_record(
        &self,
        ctx: &OpContext,
        id: RecordId,
        changes: &FieldChanges,
    ) -> Result<Record, CoreError> {
        self.store
            .apply_update_within(ctx, id, changes)
            .await
            .map_err(CoreError::from)
    }

    async fn list_versions(
        &self,
        ctx: &OpContext,
        id: RecordId,
    ) -> Result<Vec<VersionNumber>, CoreError> {
        ctx.run(async { self.store.list_versions(id).await.map_err(CoreError::from) })
            .await
    }
}
