pub mod diagnostics_store;
pub mod local_store;
pub mod remote_api;

pub use diagnostics_store::DiagnosticsStore;
pub use local_store::{
    AckOutcome, LocalStore, QueueAck, QueueCounts, RecordWrite, WriteOutcome,
};
pub use remote_api::{DispatchError, RemoteApi, RemoteRecord};
