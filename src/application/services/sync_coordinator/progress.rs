use crate::domain::entities::SyncProgress;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::broadcast;

pub(super) const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Per-pass progress counter shared by the table runners.
pub(super) struct ProgressTracker {
    sender: broadcast::Sender<SyncProgress>,
    total: u32,
    completed: AtomicU32,
}

impl ProgressTracker {
    pub(super) fn new(sender: broadcast::Sender<SyncProgress>, total: u32) -> Self {
        Self {
            sender,
            total,
            completed: AtomicU32::new(0),
        }
    }

    pub(super) fn start(&self) {
        self.emit(SyncProgress::new(self.total, 0, "Preparing sync"));
    }

    pub(super) fn advance(&self, label: String) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit(SyncProgress::new(self.total, completed, label));
    }

    fn emit(&self, progress: SyncProgress) {
        // No subscribers is fine.
        let _ = self.sender.send(progress);
    }
}
