use super::progress::ProgressTracker;
use crate::application::ports::{
    AckOutcome, DispatchError, LocalStore, QueueAck, RemoteApi, RemoteRecord,
};
use crate::application::services::sync_metrics::SyncMetricsRecorder;
use crate::domain::entities::{
    AgentOutcome, EntityRecord, ErrorLogDraft, ItemFailure, PassTally, SyncQueueEntry,
};
use crate::domain::sync::ExecutionPlan;
use crate::domain::validation::{validate_entry, validate_image_asset};
use crate::domain::value_objects::{EntityTable, ErrorKind, ServerId, SyncAction};
use crate::shared::config::{SyncConfig, ValidationConfig};
use crate::shared::error::AppError;
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_IMAGE_STATUS: &str = "pending";

enum ItemOutcome {
    Synced,
    Skipped,
    Failed(ItemFailure),
}

impl ItemOutcome {
    fn into_tally(self) -> PassTally {
        let mut tally = PassTally::default();
        match self {
            ItemOutcome::Synced => tally.synced = 1,
            ItemOutcome::Skipped => tally.skipped = 1,
            ItemOutcome::Failed(failure) => {
                tally.failed = 1;
                tally.errors.push(failure);
            }
        }
        tally
    }
}

/// Where an entry stands after a failure was recorded against it.
enum FailureState {
    Retained(u32),
    Purged,
    /// Removed by a concurrent local write while in flight.
    Vanished,
}

enum Sent {
    Stored(RemoteRecord),
    Deleted,
}

/// Sends queue entries to the remote and folds the answers back into the store.
pub(super) struct Dispatcher {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteApi>,
    recorder: Arc<SyncMetricsRecorder>,
    sync: SyncConfig,
    validation: ValidationConfig,
}

impl Dispatcher {
    pub(super) fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteApi>,
        recorder: Arc<SyncMetricsRecorder>,
        sync: SyncConfig,
        validation: ValidationConfig,
    ) -> Self {
        Self {
            store,
            remote,
            recorder,
            sync,
            validation,
        }
    }

    /// Drains each table in order. Entries inside a table keep enqueue order,
    /// except images under a batching plan.
    pub(super) async fn run_tables(
        &self,
        groups: Vec<(EntityTable, Vec<SyncQueueEntry>)>,
        plan: &ExecutionPlan,
        progress: &ProgressTracker,
    ) -> PassTally {
        let mut tally = PassTally::default();
        for (table, entries) in groups {
            debug!(target: "fieldsync::sync", %table, count = entries.len(), "syncing table");
            if table == EntityTable::ImageAssets && plan.image_batch_size > 1 {
                tally.absorb(self.run_image_batches(entries, plan, progress).await);
                continue;
            }
            for entry in entries {
                tally.absorb(self.process(entry, progress).await);
            }
        }
        tally
    }

    async fn run_image_batches(
        &self,
        entries: Vec<SyncQueueEntry>,
        plan: &ExecutionPlan,
        progress: &ProgressTracker,
    ) -> PassTally {
        let mut tally = PassTally::default();
        let batches: Vec<&[SyncQueueEntry]> = entries.chunks(plan.image_batch_size).collect();
        let last = batches.len().saturating_sub(1);

        for (index, batch) in batches.into_iter().enumerate() {
            let results = join_all(
                batch
                    .iter()
                    .cloned()
                    .map(|entry| self.process(entry, progress)),
            )
            .await;
            for result in results {
                tally.absorb(result);
            }
            if index < last && self.sync.image_batch_pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.sync.image_batch_pause_ms)).await;
            }
        }
        tally
    }

    /// Store errors on a single item become a failure of that item; they never
    /// abort the pass.
    async fn process(&self, entry: SyncQueueEntry, progress: &ProgressTracker) -> PassTally {
        let label = entry.label();
        let outcome = match self.process_entry(&entry).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    target: "fieldsync::sync",
                    entry_id = %entry.id,
                    table = %entry.table,
                    error = %e,
                    "store error while syncing entry"
                );
                ItemOutcome::Failed(ItemFailure {
                    table: entry.table,
                    record_id: entry.record_id.clone(),
                    kind: ErrorKind::Unknown,
                    message: e.to_string(),
                    purged: false,
                })
            }
        };
        progress.advance(label);
        outcome.into_tally()
    }

    async fn process_entry(&self, entry: &SyncQueueEntry) -> Result<ItemOutcome, AppError> {
        let Some(resource) = entry.table.resource_path() else {
            self.store.purge(entry.id).await?;
            return Ok(ItemOutcome::Skipped);
        };

        if let Err(invalid) = validate_entry(
            entry.table,
            entry.action,
            &entry.payload_snapshot,
            &self.validation,
        ) {
            let error = DispatchError::new(ErrorKind::Validation, invalid.to_string());
            return self.fail(entry, error).await;
        }

        let Some(record) = self.store.load_record(entry.table, &entry.record_id).await? else {
            self.store.purge(entry.id).await?;
            return Ok(if entry.action == SyncAction::Delete {
                ItemOutcome::Synced
            } else {
                ItemOutcome::Skipped
            });
        };

        let remaining = self.sync.max_retries.saturating_sub(entry.retry_count);
        let budget = self.sync.attempts_per_pass.min(remaining).max(1);

        for attempt in 1..=budget {
            let error = match self.send(resource, entry, &record).await {
                Ok(sent) => return self.complete(entry, resource, sent).await,
                Err(error) => error,
            };
            debug!(
                target: "fieldsync::sync",
                entry_id = %entry.id,
                attempt,
                kind = %error.kind,
                "dispatch attempt failed"
            );

            let retryable = error.is_retryable();
            match self.register_failure(entry, &error).await? {
                FailureState::Vanished => return Ok(ItemOutcome::Skipped),
                FailureState::Purged => return Ok(Self::failed(entry, error, true)),
                FailureState::Retained(_) if !retryable || attempt == budget => {
                    return Ok(Self::failed(entry, error, false));
                }
                FailureState::Retained(retry_count) => {
                    let delay = self.sync.retry_base_delay_ms.saturating_mul(u64::from(attempt));
                    debug!(
                        target: "fieldsync::sync",
                        entry_id = %entry.id,
                        retry_count,
                        delay_ms = delay,
                        "retrying entry"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }

        // Every branch of the final attempt returns above.
        Ok(ItemOutcome::Skipped)
    }

    async fn fail(
        &self,
        entry: &SyncQueueEntry,
        error: DispatchError,
    ) -> Result<ItemOutcome, AppError> {
        Ok(match self.register_failure(entry, &error).await? {
            FailureState::Vanished => ItemOutcome::Skipped,
            FailureState::Purged => Self::failed(entry, error, true),
            FailureState::Retained(_) => Self::failed(entry, error, false),
        })
    }

    fn failed(entry: &SyncQueueEntry, error: DispatchError, purged: bool) -> ItemOutcome {
        ItemOutcome::Failed(ItemFailure {
            table: entry.table,
            record_id: entry.record_id.clone(),
            kind: error.kind,
            message: error.message,
            purged,
        })
    }

    async fn register_failure(
        &self,
        entry: &SyncQueueEntry,
        error: &DispatchError,
    ) -> Result<FailureState, AppError> {
        let retry_count = match self.store.mark_failed(entry.id, &error.message).await {
            Ok(count) => count,
            Err(AppError::NotFound(_)) => return Ok(FailureState::Vanished),
            Err(e) => return Err(e),
        };
        if retry_count < self.sync.max_retries {
            return Ok(FailureState::Retained(retry_count));
        }

        self.store.purge(entry.id).await?;
        warn!(
            target: "fieldsync::sync",
            entry_id = %entry.id,
            table = %entry.table,
            record_id = %entry.record_id,
            kind = %error.kind,
            retry_count,
            "retry ceiling reached, entry purged"
        );
        self.recorder
            .log_error(ErrorLogDraft {
                category: error.kind,
                table: Some(entry.table),
                record_id: Some(entry.record_id.clone()),
                action: Some(entry.action),
                message: error.message.clone(),
                retry_count,
            })
            .await;
        Ok(FailureState::Purged)
    }

    async fn send(
        &self,
        resource: &str,
        entry: &SyncQueueEntry,
        record: &EntityRecord,
    ) -> Result<Sent, DispatchError> {
        let body = &entry.payload_snapshot;
        match (entry.action, &record.server_id) {
            (SyncAction::Delete, Some(server_id)) => {
                match self.remote.delete(resource, server_id).await {
                    Ok(()) => Ok(Sent::Deleted),
                    Err(error) if error.kind == ErrorKind::NotFound => Ok(Sent::Deleted),
                    Err(error) => Err(error),
                }
            }
            (SyncAction::Delete | SyncAction::Update, None) => Err(DispatchError::new(
                ErrorKind::Validation,
                format!("{} without a server id", entry.action),
            )),
            // A create that already reached the remote is replayed as an update.
            (_, Some(server_id)) => self
                .remote
                .update(resource, server_id, body)
                .await
                .map(Sent::Stored),
            (SyncAction::Create, None) if entry.table == EntityTable::ImageAssets => {
                self.upload_image(resource, entry).await.map(Sent::Stored)
            }
            (SyncAction::Create, None) => {
                self.remote.create(resource, body).await.map(Sent::Stored)
            }
        }
    }

    async fn upload_image(
        &self,
        resource: &str,
        entry: &SyncQueueEntry,
    ) -> Result<RemoteRecord, DispatchError> {
        let upload = validate_image_asset(&entry.payload_snapshot, self.validation.max_image_bytes)
            .map_err(|e| DispatchError::new(ErrorKind::Validation, e.to_string()))?;
        let mut metadata = entry.payload_snapshot.clone();
        metadata.remove("data");
        let status = entry
            .payload_snapshot
            .get_str("status")
            .unwrap_or(DEFAULT_IMAGE_STATUS);
        self.remote
            .upload_image(resource, upload, &metadata, status)
            .await
    }

    async fn complete(
        &self,
        entry: &SyncQueueEntry,
        resource: &str,
        sent: Sent,
    ) -> Result<ItemOutcome, AppError> {
        let (server_id, remote_fields) = match sent {
            Sent::Stored(remote) => (Some(remote.server_id), Some(remote.fields)),
            Sent::Deleted => (None, None),
        };
        let ack = QueueAck {
            entry_id: entry.id,
            revision: entry.revision,
            table: entry.table,
            record_id: entry.record_id.clone(),
            action: entry.action,
            server_id: server_id.clone(),
            remote_fields,
        };

        match self.store.acknowledge(ack).await? {
            AckOutcome::Completed => {
                if let Some(outcome) = agent_outcome(entry) {
                    self.recorder.record_agent_outcome(outcome).await;
                }
            }
            AckOutcome::Superseded => {
                debug!(
                    target: "fieldsync::sync",
                    entry_id = %entry.id,
                    "entry changed during dispatch, kept for next pass"
                );
            }
            AckOutcome::Missing => {
                if entry.action == SyncAction::Create {
                    if let Some(server_id) = server_id {
                        self.remove_orphan(resource, &server_id).await;
                    }
                }
            }
        }
        Ok(ItemOutcome::Synced)
    }

    /// The record was deleted locally while its create was in flight.
    async fn remove_orphan(&self, resource: &str, server_id: &ServerId) {
        match self.remote.delete(resource, server_id).await {
            Ok(()) => {
                debug!(target: "fieldsync::sync", %resource, %server_id, "removed orphaned remote record");
            }
            Err(e) if e.kind == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    target: "fieldsync::sync",
                    %resource,
                    %server_id,
                    error = %e,
                    "failed to remove orphaned remote record"
                );
            }
        }
    }
}

/// Analysis jobs that reached a terminal status feed the per-agent metrics.
fn agent_outcome(entry: &SyncQueueEntry) -> Option<AgentOutcome> {
    if entry.table != EntityTable::AnalysisJobs || entry.action == SyncAction::Delete {
        return None;
    }
    let payload = &entry.payload_snapshot;
    let succeeded = match payload.get_str("status")? {
        "completed" => true,
        "failed" => false,
        _ => return None,
    };
    let latency_ms = ["processingTimeMs", "latencyMs"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_f64))
        .map(|ms| ms.max(0.0) as u64)
        .unwrap_or(0);

    Some(AgentOutcome {
        agent_type: payload.get_str("agentType")?.to_string(),
        succeeded,
        latency_ms,
        confidence: payload.get("confidence").and_then(Value::as_f64),
        day: Utc::now().date_naive(),
    })
}

/// Groups a FIFO snapshot by table. Tables are ordered by their most urgent
/// entry, ties by first appearance.
pub(super) fn group_by_table(
    entries: Vec<SyncQueueEntry>,
) -> Vec<(EntityTable, Vec<SyncQueueEntry>)> {
    let mut groups: Vec<(EntityTable, Vec<SyncQueueEntry>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(table, _)| *table == entry.table) {
            Some((_, items)) => items.push(entry),
            None => groups.push((entry.table, vec![entry])),
        }
    }
    groups.sort_by_key(|(_, items)| {
        items
            .iter()
            .map(|entry| entry.priority)
            .min()
            .unwrap_or_default()
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{EntityPayload, LocalId, SyncPriority, SyncQueueId};
    use serde_json::json;

    fn entry(id: i64, table: EntityTable, priority: SyncPriority, payload: Value) -> SyncQueueEntry {
        SyncQueueEntry {
            id: SyncQueueId::new(id).unwrap(),
            table,
            record_id: LocalId::generate(),
            action: SyncAction::Create,
            payload_snapshot: EntityPayload::new(payload).unwrap(),
            priority,
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
            revision: 0,
        }
    }

    #[test]
    fn groups_keep_enqueue_order_and_lead_with_urgent_tables() {
        let entries = vec![
            entry(1, EntityTable::Lots, SyncPriority::Normal, json!({})),
            entry(2, EntityTable::Tasks, SyncPriority::Low, json!({})),
            entry(3, EntityTable::Lots, SyncPriority::Normal, json!({})),
            entry(4, EntityTable::Expenses, SyncPriority::Critical, json!({})),
        ];

        let groups = group_by_table(entries);

        let tables: Vec<EntityTable> = groups.iter().map(|(table, _)| *table).collect();
        assert_eq!(
            tables,
            vec![EntityTable::Expenses, EntityTable::Lots, EntityTable::Tasks]
        );
        let lot_ids: Vec<i64> = groups[1].1.iter().map(|e| e.id.value()).collect();
        assert_eq!(lot_ids, vec![1, 3]);
    }

    #[test]
    fn only_terminal_analysis_jobs_produce_agent_outcomes() {
        let done = entry(
            1,
            EntityTable::AnalysisJobs,
            SyncPriority::Normal,
            json!({
                "agentType": "crop_health",
                "status": "completed",
                "processingTimeMs": 840,
                "confidence": 0.9,
            }),
        );
        let outcome = agent_outcome(&done).expect("outcome");
        assert!(outcome.succeeded);
        assert_eq!(outcome.latency_ms, 840);
        assert_eq!(outcome.confidence, Some(0.9));

        let running = entry(
            2,
            EntityTable::AnalysisJobs,
            SyncPriority::Normal,
            json!({"agentType": "crop_health", "status": "processing"}),
        );
        assert!(agent_outcome(&running).is_none());
        let lot = entry(3, EntityTable::Lots, SyncPriority::Normal, json!({"status": "completed"}));
        assert!(agent_outcome(&lot).is_none());
    }
}
