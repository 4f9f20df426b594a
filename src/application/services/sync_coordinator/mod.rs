mod coordinator;
mod dispatch;
mod gate;
mod progress;
mod trigger;


pub use coordinator::SyncCoordinator;
pub use gate::{PassGate, PassGuard, PassState};
pub use trigger::{AutoSyncHandle, SyncTrigger};
