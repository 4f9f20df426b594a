use crate::application::ports::{LocalStore, RecordWrite, WriteOutcome};
use crate::domain::entities::{EntityRecord, SyncMetadata, SyncQueueDraft};
use crate::domain::value_objects::{
    EntityPayload, EntityTable, LocalId, SyncAction, SyncPriority,
};
use crate::shared::error::AppError;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Keys owned by the sync layer; stripped from host-supplied fields.
const RESERVED_KEYS: [&str; 3] = ["id", "localId", "serverId"];

/// The only write path into the local store. Every mutation stamps sync
/// metadata and lands its queue entry in the same transaction.
pub struct EntityRepository {
    store: Arc<dyn LocalStore>,
}

impl EntityRepository {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    fn sanitize(fields: Value) -> Result<EntityPayload, AppError> {
        let mut payload = EntityPayload::new(fields).map_err(AppError::InvalidInput)?;
        for key in RESERVED_KEYS {
            payload.remove(key);
        }
        Ok(payload)
    }

    fn draft_for(
        record: &EntityRecord,
        action: SyncAction,
        priority: SyncPriority,
    ) -> Option<SyncQueueDraft> {
        record.table.is_synced().then(|| {
            SyncQueueDraft::new(
                record.table,
                record.local_id.clone(),
                action,
                record.data.clone(),
                priority,
            )
        })
    }

    fn new_record(table: EntityTable, fields: Value) -> Result<EntityRecord, AppError> {
        let now = Utc::now();
        let mut sync = SyncMetadata::pending(SyncAction::Create);
        sync.pending_sync = table.is_synced();
        Ok(EntityRecord {
            local_id: LocalId::generate(),
            table,
            server_id: None,
            data: Self::sanitize(fields)?,
            sync,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub async fn create(&self, table: EntityTable, fields: Value) -> Result<LocalId, AppError> {
        self.create_with_priority(table, fields, SyncPriority::default())
            .await
    }

    pub async fn create_with_priority(
        &self,
        table: EntityTable,
        fields: Value,
        priority: SyncPriority,
    ) -> Result<LocalId, AppError> {
        let record = Self::new_record(table, fields)?;
        let local_id = record.local_id.clone();
        let enqueue = Self::draft_for(&record, SyncAction::Create, priority);

        self.store.write_record(RecordWrite { record, enqueue }).await?;
        debug!(target: "fieldsync::store", %table, %local_id, "record created");
        Ok(local_id)
    }

    async fn load_live(&self, table: EntityTable, id: &LocalId) -> Result<EntityRecord, AppError> {
        match self.store.load_record(table, id).await? {
            Some(record) if !record.is_tombstone() => Ok(record),
            _ => Err(AppError::not_found(table.as_str(), id.as_str())),
        }
    }

    /// Shallow-merges `partial` into the stored fields.
    pub async fn update(
        &self,
        table: EntityTable,
        id: &LocalId,
        partial: Value,
    ) -> Result<EntityRecord, AppError> {
        let mut record = self.load_live(table, id).await?;
        let patch = Self::sanitize(partial)?;
        record.data.merge(&patch);
        record.updated_at = Utc::now();
        record.sync.pending_sync = record.table.is_synced();
        record.sync.action = SyncAction::Update;

        let enqueue = Self::draft_for(&record, SyncAction::Update, SyncPriority::default());
        self.store
            .write_record(RecordWrite {
                record: record.clone(),
                enqueue,
            })
            .await?;
        debug!(target: "fieldsync::store", %table, local_id = %id, "record updated");

        match self.store.load_record(table, id).await? {
            Some(stored) => Ok(stored),
            None => Ok(record),
        }
    }

    /// Tombstones the record until the remote confirms the delete. Records the
    /// remote never saw are removed immediately.
    pub async fn delete(&self, table: EntityTable, id: &LocalId) -> Result<(), AppError> {
        let mut record = self.load_live(table, id).await?;

        if !table.is_synced() {
            return self.store.remove_record(table, id).await;
        }

        let now = Utc::now();
        record.deleted_at = Some(now);
        record.updated_at = now;
        record.sync = SyncMetadata::pending(SyncAction::Delete);
        let enqueue = Self::draft_for(&record, SyncAction::Delete, SyncPriority::default());

        let outcome = self.store.write_record(RecordWrite { record, enqueue }).await?;
        debug!(
            target: "fieldsync::store",
            %table,
            local_id = %id,
            cancelled = matches!(outcome, WriteOutcome::Cancelled),
            "record deleted"
        );
        Ok(())
    }

    /// Imports many records in one transaction.
    pub async fn bulk_import(
        &self,
        table: EntityTable,
        rows: Vec<Value>,
    ) -> Result<Vec<LocalId>, AppError> {
        let mut ids = Vec::with_capacity(rows.len());
        let mut writes = Vec::with_capacity(rows.len());
        for fields in rows {
            let record = Self::new_record(table, fields)?;
            ids.push(record.local_id.clone());
            let enqueue = Self::draft_for(&record, SyncAction::Create, SyncPriority::Low);
            writes.push(RecordWrite { record, enqueue });
        }

        let stored = self.store.write_records(writes).await?;
        debug!(target: "fieldsync::store", %table, stored, "bulk import committed");
        Ok(ids)
    }

    pub async fn get(
        &self,
        table: EntityTable,
        id: &LocalId,
    ) -> Result<Option<EntityRecord>, AppError> {
        Ok(self
            .store
            .load_record(table, id)
            .await?
            .filter(|record| !record.is_tombstone()))
    }

    pub async fn list(&self, table: EntityTable) -> Result<Vec<EntityRecord>, AppError> {
        self.store.list_records(table).await
    }

    pub async fn find_by_field(
        &self,
        table: EntityTable,
        field: &str,
        value: &Value,
    ) -> Result<Vec<EntityRecord>, AppError> {
        self.store.find_records_by_field(table, field, value).await
    }

    pub async fn pending(&self, table: EntityTable) -> Result<Vec<EntityRecord>, AppError> {
        self.store.pending_records(table).await
    }
}
