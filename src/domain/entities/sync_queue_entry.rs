use crate::domain::value_objects::{
    EntityPayload, EntityTable, LocalId, SyncAction, SyncPriority, SyncQueueId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pending remote operation. At most one exists per `(table, record_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueEntry {
    pub id: SyncQueueId,
    pub table: EntityTable,
    pub record_id: LocalId,
    pub action: SyncAction,
    pub payload_snapshot: EntityPayload,
    pub priority: SyncPriority,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    /// Bumped whenever a newer mutation replaces the snapshot.
    pub revision: i64,
}

impl SyncQueueEntry {
    /// Label shown to progress subscribers.
    pub fn label(&self) -> String {
        let name = ["name", "title", "description"]
            .iter()
            .find_map(|key| self.payload_snapshot.get_str(key));
        match name {
            Some(name) => format!("{} · {}", self.table.label(), name),
            None => format!("{} · {}", self.table.label(), self.action),
        }
    }
}

/// What the write path hands to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncQueueDraft {
    pub table: EntityTable,
    pub record_id: LocalId,
    pub action: SyncAction,
    pub payload_snapshot: EntityPayload,
    pub priority: SyncPriority,
}

impl SyncQueueDraft {
    pub fn new(
        table: EntityTable,
        record_id: LocalId,
        action: SyncAction,
        payload_snapshot: EntityPayload,
        priority: SyncPriority,
    ) -> Self {
        Self {
            table,
            record_id,
            action,
            payload_snapshot,
            priority,
        }
    }
}

/// Result of folding a new mutation into the existing queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMerge {
    Insert(SyncAction),
    Replace(SyncAction),
    /// A create that never reached the remote was deleted: drop both.
    Cancel,
}

impl QueueMerge {
    pub fn resolve(existing: Option<SyncAction>, incoming: SyncAction) -> Self {
        match (existing, incoming) {
            (None, action) => QueueMerge::Insert(action),
            (Some(SyncAction::Create), SyncAction::Delete) => QueueMerge::Cancel,
            (Some(SyncAction::Create), _) => QueueMerge::Replace(SyncAction::Create),
            (Some(_), SyncAction::Delete) => QueueMerge::Replace(SyncAction::Delete),
            (Some(_), _) => QueueMerge::Replace(SyncAction::Update),
        }
    }
}
