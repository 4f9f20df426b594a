use crate::domain::entities::{AgentDailyMetric, AgentOutcome, ErrorLogDraft, ErrorLogEntry};
use crate::domain::value_objects::ErrorKind;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait DiagnosticsStore: Send + Sync {
    async fn append_error(&self, draft: ErrorLogDraft) -> Result<i64, AppError>;
    async fn recent_errors(&self, limit: u32) -> Result<Vec<ErrorLogEntry>, AppError>;
    async fn error_counts_by_category(&self) -> Result<Vec<(ErrorKind, u32)>, AppError>;
    async fn record_agent_outcome(&self, outcome: AgentOutcome) -> Result<(), AppError>;
    async fn agent_metrics(
        &self,
        agent_type: &str,
        day: NaiveDate,
    ) -> Result<Option<AgentDailyMetric>, AppError>;
}
