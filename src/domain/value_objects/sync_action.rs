use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(SyncAction::Create),
            "update" => Ok(SyncAction::Update),
            "delete" => Ok(SyncAction::Delete),
            other => Err(format!("Unknown sync action: {other}")),
        }
    }
}

/// Dispatch priority. Ordered most urgent first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SyncPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl SyncPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPriority::Critical => "critical",
            SyncPriority::High => "high",
            SyncPriority::Normal => "normal",
            SyncPriority::Low => "low",
        }
    }

    pub fn rank(&self) -> i64 {
        match self {
            SyncPriority::Critical => 0,
            SyncPriority::High => 1,
            SyncPriority::Normal => 2,
            SyncPriority::Low => 3,
        }
    }

    pub fn from_rank(rank: i64) -> Self {
        match rank {
            0 => SyncPriority::Critical,
            1 => SyncPriority::High,
            3 => SyncPriority::Low,
            _ => SyncPriority::Normal,
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, SyncPriority::Critical | SyncPriority::High)
    }
}

impl fmt::Display for SyncPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
