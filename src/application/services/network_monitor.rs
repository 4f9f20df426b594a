use crate::domain::sync::{ConnectionClass, DEFAULT_RESOURCE_LEVEL, NetworkState, SyncStrategy};
use tokio::sync::watch;
use tracing::info;

/// Holds the latest connectivity/resource signals raised by the host and
/// publishes every change to watchers.
pub struct NetworkMonitor {
    state: watch::Sender<NetworkState>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn offline() -> Self {
        Self::new(NetworkState::default())
    }

    pub fn current(&self) -> NetworkState {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    pub fn strategy(&self) -> SyncStrategy {
        SyncStrategy::select(&self.current())
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.state.subscribe()
    }

    /// Returns `true` when this call flipped the device from offline to online.
    pub fn set_online(&self, online: bool) -> bool {
        let mut restored = false;
        self.state.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            restored = online;
            state.online = online;
            true
        });
        if restored {
            info!(target: "fieldsync::sync", "connectivity restored");
        }
        restored
    }

    pub fn set_connection(&self, connection: ConnectionClass) {
        self.state.send_if_modified(|state| {
            let changed = state.connection != connection;
            state.connection = connection;
            changed
        });
    }

    /// `None` when the host cannot read the level.
    pub fn set_resource_level(&self, level: Option<u8>) {
        let next = level.map(|l| l.min(100)).unwrap_or(DEFAULT_RESOURCE_LEVEL);
        self.state.send_if_modified(|state| {
            let changed = state.resource_level != next;
            state.resource_level = next;
            changed
        });
    }

    pub fn update(&self, next: NetworkState) -> bool {
        let was_online = self.is_online();
        self.state.send_replace(next);
        !was_online && next.online
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::offline()
    }
}
