use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Local collections tracked by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Lots,
    InventoryItems,
    Tasks,
    PestObservations,
    Harvests,
    Expenses,
    ImageAssets,
    AnalysisJobs,
    Notifications,
    AgentConfigs,
    Metrics,
    Sessions,
    ModelCacheEntries,
    ErrorLogEntries,
    UserPreferences,
    PushSubscriptions,
    NotificationStats,
}

impl EntityTable {
    pub const ALL: [EntityTable; 17] = [
        EntityTable::Lots,
        EntityTable::InventoryItems,
        EntityTable::Tasks,
        EntityTable::PestObservations,
        EntityTable::Harvests,
        EntityTable::Expenses,
        EntityTable::ImageAssets,
        EntityTable::AnalysisJobs,
        EntityTable::Notifications,
        EntityTable::AgentConfigs,
        EntityTable::Metrics,
        EntityTable::Sessions,
        EntityTable::ModelCacheEntries,
        EntityTable::ErrorLogEntries,
        EntityTable::UserPreferences,
        EntityTable::PushSubscriptions,
        EntityTable::NotificationStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityTable::Lots => "lots",
            EntityTable::InventoryItems => "inventory_items",
            EntityTable::Tasks => "tasks",
            EntityTable::PestObservations => "pest_observations",
            EntityTable::Harvests => "harvests",
            EntityTable::Expenses => "expenses",
            EntityTable::ImageAssets => "image_assets",
            EntityTable::AnalysisJobs => "analysis_jobs",
            EntityTable::Notifications => "notifications",
            EntityTable::AgentConfigs => "agent_configs",
            EntityTable::Metrics => "metrics",
            EntityTable::Sessions => "sessions",
            EntityTable::ModelCacheEntries => "model_cache_entries",
            EntityTable::ErrorLogEntries => "error_log_entries",
            EntityTable::UserPreferences => "user_preferences",
            EntityTable::PushSubscriptions => "push_subscriptions",
            EntityTable::NotificationStats => "notification_stats",
        }
    }

    /// Remote resource path, or `None` for tables that never leave the device.
    pub fn resource_path(&self) -> Option<&'static str> {
        match self {
            EntityTable::Lots => Some("lots"),
            EntityTable::InventoryItems => Some("inventory"),
            EntityTable::Tasks => Some("tasks"),
            EntityTable::PestObservations => Some("pest-monitoring"),
            EntityTable::Harvests => Some("harvests"),
            EntityTable::Expenses => Some("expenses"),
            EntityTable::ImageAssets => Some("ai/images"),
            EntityTable::AnalysisJobs => Some("ai/analysis"),
            EntityTable::Notifications => Some("ai/notifications"),
            _ => None,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.resource_path().is_some()
    }

    /// Tables drained by the image/analysis/notification sub-syncs.
    pub fn is_ai_sub_sync(&self) -> bool {
        matches!(
            self,
            EntityTable::ImageAssets | EntityTable::AnalysisJobs | EntityTable::Notifications
        )
    }

    /// Human label used in progress events.
    pub fn label(&self) -> &'static str {
        match self {
            EntityTable::Lots => "Lots",
            EntityTable::InventoryItems => "Inventory",
            EntityTable::Tasks => "Tasks",
            EntityTable::PestObservations => "Pest observations",
            EntityTable::Harvests => "Harvests",
            EntityTable::Expenses => "Expenses",
            EntityTable::ImageAssets => "Images",
            EntityTable::AnalysisJobs => "Analysis jobs",
            EntityTable::Notifications => "Notifications",
            EntityTable::AgentConfigs => "Agent configs",
            EntityTable::Metrics => "Metrics",
            EntityTable::Sessions => "Sessions",
            EntityTable::ModelCacheEntries => "Model cache",
            EntityTable::ErrorLogEntries => "Error log",
            EntityTable::UserPreferences => "Preferences",
            EntityTable::PushSubscriptions => "Push subscriptions",
            EntityTable::NotificationStats => "Notification stats",
        }
    }
}

impl fmt::Display for EntityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityTable::ALL
            .iter()
            .copied()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| format!("Unknown entity table: {s}"))
    }
}
