pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{EntityRepository, NetworkMonitor, SyncCoordinator};
pub use state::AppState;
