pub mod diagnostics;
pub mod entity_record;
pub mod sync_pass;
pub mod sync_queue_entry;

pub use diagnostics::{
    AgentDailyMetric, AgentOutcome, ErrorLogDraft, ErrorLogEntry, HealthLabel, SyncHealthReport,
};
pub use entity_record::{EntityRecord, SyncMetadata};
pub use sync_pass::{
    ItemFailure, PassOutcome, PassRejection, PassTally, SyncProgress, SyncStatusSnapshot,
};
pub use sync_queue_entry::{QueueMerge, SyncQueueDraft, SyncQueueEntry};
