use crate::domain::value_objects::SyncPriority;
use crate::shared::config::SyncConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_RESOURCE_LEVEL: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionClass {
    Wifi,
    Cellular,
    #[default]
    Unknown,
}

impl ConnectionClass {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "wifi" | "ethernet" => ConnectionClass::Wifi,
            "cellular" | "2g" | "3g" | "4g" | "5g" => ConnectionClass::Cellular,
            _ => ConnectionClass::Unknown,
        }
    }
}

/// Latest connectivity and device-resource signals from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    pub online: bool,
    pub connection: ConnectionClass,
    /// 0–100; hosts that cannot read it report `DEFAULT_RESOURCE_LEVEL`.
    pub resource_level: u8,
}

impl NetworkState {
    pub fn new(online: bool, connection: ConnectionClass, resource_level: Option<u8>) -> Self {
        Self {
            online,
            connection,
            resource_level: resource_level
                .map(|level| level.min(100))
                .unwrap_or(DEFAULT_RESOURCE_LEVEL),
        }
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::new(false, ConnectionClass::Unknown, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    Aggressive,
    Balanced,
    Conservative,
}

impl SyncStrategy {
    /// Conservative wins over aggressive: cellular never fans out.
    pub fn select(state: &NetworkState) -> Self {
        if state.connection == ConnectionClass::Cellular || state.resource_level < 20 {
            SyncStrategy::Conservative
        } else if state.connection == ConnectionClass::Wifi && state.resource_level > 50 {
            SyncStrategy::Aggressive
        } else {
            SyncStrategy::Balanced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStrategy::Aggressive => "aggressive",
            SyncStrategy::Balanced => "balanced",
            SyncStrategy::Conservative => "conservative",
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a pass executes under a given strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub strategy: SyncStrategy,
    /// Run the image/analysis/notification sub-syncs alongside the core tables.
    pub concurrent_sub_syncs: bool,
    pub image_batch_size: usize,
    /// `true` restricts dispatch to critical/high priority entries.
    pub urgent_only: bool,
}

impl ExecutionPlan {
    pub fn for_strategy(strategy: SyncStrategy, config: &SyncConfig) -> Self {
        match strategy {
            SyncStrategy::Aggressive => Self {
                strategy,
                concurrent_sub_syncs: true,
                image_batch_size: config.aggressive_image_batch_size.max(1),
                urgent_only: false,
            },
            SyncStrategy::Balanced => Self {
                strategy,
                concurrent_sub_syncs: false,
                image_batch_size: config.image_batch_size.max(1),
                urgent_only: false,
            },
            SyncStrategy::Conservative => Self {
                strategy,
                concurrent_sub_syncs: false,
                image_batch_size: 1,
                urgent_only: true,
            },
        }
    }

    pub fn admits(&self, priority: SyncPriority) -> bool {
        !self.urgent_only || priority.is_urgent()
    }
}
