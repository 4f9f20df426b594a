use crate::domain::sync::SyncStrategy;
use crate::domain::value_objects::{EntityTable, ErrorKind, LocalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassRejection {
    Offline,
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub table: EntityTable,
    pub record_id: LocalId,
    pub kind: ErrorKind,
    pub message: String,
    pub purged: bool,
}

/// Outcome of one trigger. `ran_successfully` says whether the pass executed at
/// all; `all_items_succeeded` says whether it executed without item failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassOutcome {
    pub ran_successfully: bool,
    pub all_items_succeeded: bool,
    pub rejection: Option<PassRejection>,
    pub strategy: Option<SyncStrategy>,
    pub synced_count: u32,
    pub failed_count: u32,
    pub expired_count: u32,
    pub skipped_count: u32,
    pub errors: Vec<ItemFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassOutcome {
    pub fn rejected(reason: PassRejection) -> Self {
        let now = Utc::now();
        Self {
            ran_successfully: false,
            all_items_succeeded: false,
            rejection: Some(reason),
            strategy: None,
            synced_count: 0,
            failed_count: 0,
            expired_count: 0,
            skipped_count: 0,
            errors: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn completed(
        strategy: SyncStrategy,
        tally: PassTally,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ran_successfully: true,
            all_items_succeeded: tally.failed == 0,
            rejection: None,
            strategy: Some(strategy),
            synced_count: tally.synced,
            failed_count: tally.failed,
            expired_count: tally.expired,
            skipped_count: tally.skipped,
            errors: tally.errors,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Running totals accumulated while a pass executes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassTally {
    pub synced: u32,
    pub failed: u32,
    pub expired: u32,
    pub skipped: u32,
    pub errors: Vec<ItemFailure>,
}

impl PassTally {
    pub fn absorb(&mut self, other: PassTally) {
        self.synced += other.synced;
        self.failed += other.failed;
        self.expired += other.expired;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub total: u32,
    pub completed: u32,
    pub current_label: String,
    pub percentage: u8,
}

impl SyncProgress {
    pub fn new(total: u32, completed: u32, current_label: impl Into<String>) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((u64::from(completed.min(total)) * 100) / u64::from(total)) as u8
        };
        Self {
            total,
            completed,
            current_label: current_label.into(),
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusSnapshot {
    pub pending_count: u32,
    /// Queued entries that have failed at least once.
    pub failed_count: u32,
    pub is_running: bool,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
}
