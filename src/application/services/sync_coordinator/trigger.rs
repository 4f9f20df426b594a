use super::coordinator::SyncCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

const TRIGGER_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Explicit,
    ConnectivityRestored,
    Timer,
}

/// Background auto-sync loop. Dropping the handle stops the loop once it is
/// idle.
pub struct AutoSyncHandle {
    triggers: mpsc::Sender<SyncTrigger>,
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    /// Asks the loop for a pass. Returns `false` if the loop has stopped or
    /// already has requests waiting.
    pub fn request(&self) -> bool {
        self.triggers.try_send(SyncTrigger::Explicit).is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(self) {
        self.task.abort();
    }
}

impl SyncCoordinator {
    /// Runs a pass on offline→online transitions, on explicit requests, and on
    /// the configured interval when auto-sync is enabled.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> AutoSyncHandle {
        let (triggers, mut requests) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
        let coordinator = Arc::clone(self);
        let mut network = coordinator.monitor.subscribe();
        let timer_enabled = coordinator.config.auto_sync;
        let period = Duration::from_secs(coordinator.config.sync_interval.max(1));
        let mut was_online = network.borrow_and_update().online;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(target: "fieldsync::sync", timer_enabled, interval_secs = period.as_secs(), "auto-sync started");

            loop {
                let trigger = tokio::select! {
                    changed = network.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = network.borrow_and_update().online;
                        let restored = online && !was_online;
                        was_online = online;
                        if !restored {
                            continue;
                        }
                        SyncTrigger::ConnectivityRestored
                    }
                    request = requests.recv() => match request {
                        Some(trigger) => trigger,
                        None => break,
                    },
                    _ = ticker.tick(), if timer_enabled => SyncTrigger::Timer,
                };

                match coordinator.run(trigger).await {
                    Ok(outcome) if outcome.ran_successfully => {}
                    Ok(outcome) => {
                        info!(target: "fieldsync::sync", ?trigger, rejection = ?outcome.rejection, "triggered pass did not start");
                    }
                    Err(e) => {
                        error!(target: "fieldsync::sync", ?trigger, error = %e, "sync pass failed");
                    }
                }
            }
            warn!(target: "fieldsync::sync", "auto-sync stopped");
        });

        AutoSyncHandle { triggers, task }
    }
}
