pub mod entity_table;
pub mod error_kind;
pub mod payload;
pub mod record_ids;
pub mod sync_action;

pub use entity_table::EntityTable;
pub use error_kind::ErrorKind;
pub use payload::EntityPayload;
pub use record_ids::{LocalId, ServerId, SyncQueueId};
pub use sync_action::{SyncAction, SyncPriority};
