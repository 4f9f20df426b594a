pub mod entity_repository;
pub mod network_monitor;
pub mod notification_dedup;
pub mod sync_coordinator;
pub mod sync_metrics;

pub use entity_repository::EntityRepository;
pub use network_monitor::NetworkMonitor;
pub use sync_coordinator::{AutoSyncHandle, SyncCoordinator, SyncTrigger};
pub use sync_metrics::{SyncMetricsRecorder, SyncMetricsSnapshot};
