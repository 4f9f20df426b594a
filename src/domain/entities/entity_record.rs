use crate::domain::value_objects::{EntityPayload, EntityTable, LocalId, ServerId, SyncAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sync bookkeeping stamped by the write path on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub last_synced_at: Option<DateTime<Utc>>,
    pub pending_sync: bool,
    pub action: SyncAction,
}

impl SyncMetadata {
    pub fn pending(action: SyncAction) -> Self {
        Self {
            last_synced_at: None,
            pending_sync: true,
            action,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub local_id: LocalId,
    pub table: EntityTable,
    pub server_id: Option<ServerId>,
    pub data: EntityPayload,
    pub sync: SyncMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EntityRecord {
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn pending_sync(&self) -> bool {
        self.sync.pending_sync
    }
}
