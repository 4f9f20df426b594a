pub mod strategy;

pub use strategy::{
    ConnectionClass, DEFAULT_RESOURCE_LEVEL, ExecutionPlan, NetworkState, SyncStrategy,
};
