use crate::domain::entities::{EntityRecord, QueueMerge, SyncQueueDraft, SyncQueueEntry};
use crate::domain::value_objects::{
    EntityPayload, EntityTable, LocalId, ServerId, SyncAction, SyncQueueId,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A record write plus the queue mutation it implies, committed together.
#[derive(Debug, Clone)]
pub struct RecordWrite {
    pub record: EntityRecord,
    /// `None` for tables that never leave the device.
    pub enqueue: Option<SyncQueueDraft>,
}

/// How a write ended up after folding into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored(Option<QueueMerge>),
    /// The record never reached the remote and is gone for good.
    Cancelled,
}

/// Remote acknowledgement for one dispatched entry.
#[derive(Debug, Clone)]
pub struct QueueAck {
    pub entry_id: SyncQueueId,
    pub revision: i64,
    pub table: EntityTable,
    pub record_id: LocalId,
    pub action: SyncAction,
    pub server_id: Option<ServerId>,
    /// Top-level fields returned by the remote, merged into the record.
    pub remote_fields: Option<EntityPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Completed,
    /// A newer mutation landed during dispatch; the entry stays queued.
    Superseded,
    /// The entry vanished before the ack (cancelled by a local delete).
    Missing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: u32,
    pub failed: u32,
}

#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn load_record(
        &self,
        table: EntityTable,
        id: &LocalId,
    ) -> Result<Option<EntityRecord>, AppError>;
    async fn list_records(&self, table: EntityTable) -> Result<Vec<EntityRecord>, AppError>;
    async fn find_records_by_field(
        &self,
        table: EntityTable,
        field: &str,
        value: &Value,
    ) -> Result<Vec<EntityRecord>, AppError>;
    async fn pending_records(&self, table: EntityTable) -> Result<Vec<EntityRecord>, AppError>;

    async fn write_record(&self, write: RecordWrite) -> Result<WriteOutcome, AppError>;
    async fn write_records(&self, writes: Vec<RecordWrite>) -> Result<usize, AppError>;
    /// Hard delete of the record and any queue entry, without a remote call.
    async fn remove_record(&self, table: EntityTable, id: &LocalId) -> Result<(), AppError>;

    async fn dequeue_all(&self) -> Result<Vec<SyncQueueEntry>, AppError>;
    async fn queue_entry(
        &self,
        table: EntityTable,
        record_id: &LocalId,
    ) -> Result<Option<SyncQueueEntry>, AppError>;
    async fn acknowledge(&self, ack: QueueAck) -> Result<AckOutcome, AppError>;
    /// Returns the entry's retry count after the increment.
    async fn mark_failed(&self, id: SyncQueueId, error: &str) -> Result<u32, AppError>;
    async fn purge(&self, id: SyncQueueId) -> Result<(), AppError>;
    /// Drops the entry and marks its record synced without a remote call.
    async fn expire(
        &self,
        id: SyncQueueId,
        table: EntityTable,
        record_id: &LocalId,
    ) -> Result<(), AppError>;
    /// Re-enqueues a pending record at critical priority with a fresh retry budget.
    async fn prioritize(&self, table: EntityTable, record_id: &LocalId) -> Result<bool, AppError>;
    async fn queue_counts(&self) -> Result<QueueCounts, AppError>;

    async fn last_sync_at(&self) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn set_last_sync_at(&self, at: DateTime<Utc>) -> Result<(), AppError>;
}
