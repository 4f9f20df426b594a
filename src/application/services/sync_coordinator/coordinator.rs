use super::dispatch::{Dispatcher, group_by_table};
use super::gate::PassGate;
use super::progress::{PROGRESS_CHANNEL_CAPACITY, ProgressTracker};
use super::trigger::SyncTrigger;
use crate::application::ports::{LocalStore, RemoteApi};
use crate::application::services::network_monitor::NetworkMonitor;
use crate::application::services::notification_dedup::{self, DropReason};
use crate::application::services::sync_metrics::SyncMetricsRecorder;
use crate::domain::entities::{
    PassOutcome, PassRejection, PassTally, SyncProgress, SyncQueueEntry, SyncStatusSnapshot,
};
use crate::domain::sync::{ExecutionPlan, SyncStrategy};
use crate::domain::value_objects::{EntityTable, LocalId};
use crate::shared::config::{SyncConfig, ValidationConfig};
use crate::shared::error::AppError;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Drains the sync queue against the remote, one pass at a time.
pub struct SyncCoordinator {
    pub(super) store: Arc<dyn LocalStore>,
    pub(super) monitor: Arc<NetworkMonitor>,
    pub(super) recorder: Arc<SyncMetricsRecorder>,
    pub(super) config: SyncConfig,
    dispatcher: Dispatcher,
    pub(super) gate: PassGate,
    progress: broadcast::Sender<SyncProgress>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteApi>,
        monitor: Arc<NetworkMonitor>,
        recorder: Arc<SyncMetricsRecorder>,
        config: SyncConfig,
        validation: ValidationConfig,
    ) -> Self {
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            remote,
            Arc::clone(&recorder),
            config.clone(),
            validation,
        );
        Self {
            store,
            monitor,
            recorder,
            config,
            dispatcher,
            gate: PassGate::new(),
            progress,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn recorder(&self) -> &Arc<SyncMetricsRecorder> {
        &self.recorder
    }

    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Explicit trigger from the host.
    pub async fn request_sync(&self) -> Result<PassOutcome, AppError> {
        self.run(SyncTrigger::Explicit).await
    }

    /// Marks the device online and starts a pass.
    pub async fn connectivity_restored(&self) -> Result<PassOutcome, AppError> {
        self.monitor.set_online(true);
        self.run(SyncTrigger::ConnectivityRestored).await
    }

    pub async fn status(&self) -> Result<SyncStatusSnapshot, AppError> {
        let counts = self.store.queue_counts().await?;
        Ok(SyncStatusSnapshot {
            pending_count: counts.pending,
            failed_count: counts.failed,
            is_running: self.gate.is_running(),
            last_sync_timestamp: self.store.last_sync_at().await?,
        })
    }

    /// Re-queues a pending record at critical priority with a fresh retry
    /// budget. Returns `false` when the record has nothing to sync.
    pub async fn prioritize(&self, table: EntityTable, id: &LocalId) -> Result<bool, AppError> {
        let queued = self.store.prioritize(table, id).await?;
        debug!(target: "fieldsync::sync", %table, local_id = %id, queued, "prioritize requested");
        Ok(queued)
    }

    pub(super) async fn run(&self, trigger: SyncTrigger) -> Result<PassOutcome, AppError> {
        if !self.monitor.is_online() {
            debug!(target: "fieldsync::sync", ?trigger, "offline, pass not started");
            return Ok(PassOutcome::rejected(PassRejection::Offline));
        }
        let Some(_guard) = self.gate.try_begin() else {
            debug!(target: "fieldsync::sync", ?trigger, "pass already running");
            return Ok(PassOutcome::rejected(PassRejection::AlreadyRunning));
        };

        let network = self.monitor.current();
        let strategy = SyncStrategy::select(&network);
        let plan = ExecutionPlan::for_strategy(strategy, &self.config);
        let started_at = Utc::now();
        info!(
            target: "fieldsync::sync",
            ?trigger,
            %strategy,
            connection = ?network.connection,
            resource_level = network.resource_level,
            "sync pass started"
        );

        let tally = self.execute(&plan).await?;
        let outcome = PassOutcome::completed(strategy, tally, started_at);
        self.store.set_last_sync_at(outcome.finished_at).await?;
        self.recorder.record_pass(&outcome);

        info!(
            target: "fieldsync::sync",
            %strategy,
            synced = outcome.synced_count,
            failed = outcome.failed_count,
            expired = outcome.expired_count,
            skipped = outcome.skipped_count,
            "sync pass finished"
        );
        Ok(outcome)
    }

    async fn execute(&self, plan: &ExecutionPlan) -> Result<PassTally, AppError> {
        let snapshot = self.store.dequeue_all().await?;
        let mut tally = PassTally::default();

        let dedup = notification_dedup::plan(
            snapshot,
            Utc::now(),
            self.config.notification_retention_days,
        );
        for (entry, reason) in dedup.drop {
            self.store
                .expire(entry.id, entry.table, &entry.record_id)
                .await?;
            debug!(
                target: "fieldsync::sync",
                entry_id = %entry.id,
                superseded = reason == DropReason::Superseded,
                "notification dropped without dispatch"
            );
            tally.expired += 1;
        }

        let (admitted, deferred): (Vec<SyncQueueEntry>, Vec<SyncQueueEntry>) = dedup
            .keep
            .into_iter()
            .partition(|entry| plan.admits(entry.priority));
        tally.skipped += u32::try_from(deferred.len()).unwrap_or(u32::MAX);

        let total = u32::try_from(admitted.len()).unwrap_or(u32::MAX);
        let progress = ProgressTracker::new(self.progress.clone(), total);
        progress.start();

        let groups = group_by_table(admitted);
        if plan.concurrent_sub_syncs {
            let (sub_syncs, core): (Vec<_>, Vec<_>) = groups
                .into_iter()
                .partition(|(table, _)| table.is_ai_sub_sync());
            let (core_tally, sub_tally) = futures::join!(
                self.dispatcher.run_tables(core, plan, &progress),
                self.dispatcher.run_tables(sub_syncs, plan, &progress)
            );
            tally.absorb(core_tally);
            tally.absorb(sub_tally);
        } else {
            tally.absorb(self.dispatcher.run_tables(groups, plan, &progress).await);
        }

        Ok(tally)
    }
}
