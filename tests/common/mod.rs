#![allow(dead_code)]

pub mod mocks;

use fieldsync::AppState;
use fieldsync::domain::sync::{ConnectionClass, NetworkState};
use fieldsync::infrastructure::offline::SqliteLocalStore;
use fieldsync::shared::config::AppConfig;
use mocks::MockRemoteApi;
use std::sync::Arc;

pub struct SyncTestContext {
    pub state: AppState,
    pub remote: Arc<MockRemoteApi>,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.retry_base_delay_ms = 0;
    config.sync.image_batch_pause_ms = 0;
    config.sync.auto_sync = false;
    config
}

pub async fn setup_offline() -> SyncTestContext {
    let store = Arc::new(SqliteLocalStore::in_memory().await.expect("in-memory store"));
    let remote = Arc::new(MockRemoteApi::default());
    let state = AppState::with_parts(test_config(), store, remote.clone());
    SyncTestContext { state, remote }
}

pub async fn setup_online(connection: ConnectionClass, level: Option<u8>) -> SyncTestContext {
    let ctx = setup_offline().await;
    ctx.state
        .monitor
        .update(NetworkState::new(true, connection, level));
    ctx
}
