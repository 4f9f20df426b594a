use crate::domain::value_objects::{EntityTable, ErrorKind, LocalId, SyncAction};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogDraft {
    pub category: ErrorKind,
    pub table: Option<EntityTable>,
    pub record_id: Option<LocalId>,
    pub action: Option<SyncAction>,
    pub message: String,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub id: i64,
    pub category: ErrorKind,
    pub table: Option<EntityTable>,
    pub record_id: Option<LocalId>,
    pub action: Option<SyncAction>,
    pub message: String,
    pub retry_count: u32,
    pub occurred_at: DateTime<Utc>,
}

/// One analysis-agent result folded into the daily aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutcome {
    pub agent_type: String,
    pub succeeded: bool,
    pub latency_ms: u64,
    pub confidence: Option<f64>,
    pub day: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDailyMetric {
    pub agent_type: String,
    pub day: NaiveDate,
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub avg_latency_ms: f64,
    /// Averaged over outcomes that reported a confidence.
    pub avg_confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthLabel {
    /// `error_rate` is failures over attempts, in `[0, 1]`.
    pub fn assess(pending_count: u32, error_rate: f64) -> Self {
        let rate = if error_rate.is_finite() {
            error_rate.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if pending_count == 0 && rate < 0.05 {
            HealthLabel::Excellent
        } else if pending_count <= 10 && rate < 0.15 {
            HealthLabel::Good
        } else if pending_count <= 50 && rate < 0.40 {
            HealthLabel::Fair
        } else {
            HealthLabel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLabel::Excellent => "excellent",
            HealthLabel::Good => "good",
            HealthLabel::Fair => "fair",
            HealthLabel::Poor => "poor",
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHealthReport {
    pub label: HealthLabel,
    pub pending_count: u32,
    pub failed_count: u32,
    pub error_rate: f64,
    pub errors_by_category: Vec<(ErrorKind, u32)>,
}

#[cfg(test)]
mod tests {
    use super::HealthLabel;

    #[test]
    fn health_degrades_with_backlog_and_errors() {
        assert_eq!(HealthLabel::assess(0, 0.0), HealthLabel::Excellent);
        assert_eq!(HealthLabel::assess(3, 0.0), HealthLabel::Good);
        assert_eq!(HealthLabel::assess(0, 0.10), HealthLabel::Good);
        assert_eq!(HealthLabel::assess(30, 0.2), HealthLabel::Fair);
        assert_eq!(HealthLabel::assess(80, 0.0), HealthLabel::Poor);
        assert_eq!(HealthLabel::assess(1, 0.9), HealthLabel::Poor);
        assert_eq!(HealthLabel::assess(0, f64::NAN), HealthLabel::Poor);
    }
}
