use crate::application::ports::RemoteApi;
use crate::application::services::{
    EntityRepository, NetworkMonitor, SyncCoordinator, SyncMetricsRecorder,
};
use crate::infrastructure::offline::SqliteLocalStore;
use crate::infrastructure::remote::HttpRemoteApi;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Everything a host needs, wired from one config.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<SqliteLocalStore>,
    pub repository: Arc<EntityRepository>,
    pub monitor: Arc<NetworkMonitor>,
    pub recorder: Arc<SyncMetricsRecorder>,
    pub coordinator: Arc<SyncCoordinator>,
}

impl AppState {
    /// Opens the database at `config.database.url` and talks to the remote over HTTP.
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;
        let store = Arc::new(SqliteLocalStore::open(&config.database).await?);
        let remote = Arc::new(HttpRemoteApi::new(&config.remote)?);
        Ok(Self::assemble(config, store, remote))
    }

    /// Same wiring with a caller-provided store and remote.
    pub fn with_parts(
        config: AppConfig,
        store: Arc<SqliteLocalStore>,
        remote: Arc<dyn RemoteApi>,
    ) -> Self {
        Self::assemble(config, store, remote)
    }

    fn assemble(config: AppConfig, store: Arc<SqliteLocalStore>, remote: Arc<dyn RemoteApi>) -> Self {
        let repository = Arc::new(EntityRepository::new(store.clone()));
        let monitor = Arc::new(NetworkMonitor::offline());
        let recorder = Arc::new(SyncMetricsRecorder::new(store.clone(), store.clone()));
        let coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            remote,
            Arc::clone(&monitor),
            Arc::clone(&recorder),
            config.sync.clone(),
            config.validation.clone(),
        ));
        info!(
            target: "fieldsync::state",
            remote = %config.remote.base_url,
            auto_sync = config.sync.auto_sync,
            "fieldsync state initialized"
        );

        Self {
            config,
            store,
            repository,
            monitor,
            recorder,
            coordinator,
        }
    }
}
