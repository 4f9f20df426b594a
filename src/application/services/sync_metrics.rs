use crate::application::ports::{DiagnosticsStore, LocalStore};
use crate::domain::entities::{
    AgentDailyMetric, AgentOutcome, ErrorLogDraft, ErrorLogEntry, HealthLabel, PassOutcome,
    SyncHealthReport,
};
use crate::domain::value_objects::ErrorKind;
use crate::shared::error::AppError;
use crate::shared::metrics::{OutcomeCounter, OutcomeSnapshot};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub passes_succeeded: u64,
    pub passes_failed: u64,
    pub items_synced: u64,
    pub items_failed: u64,
    pub consecutive_item_failures: u64,
    pub last_pass_duration_ms: Option<u64>,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
}

/// Folds pass and item outcomes into in-process counters and the persisted
/// diagnostics tables.
pub struct SyncMetricsRecorder {
    diagnostics: Arc<dyn DiagnosticsStore>,
    store: Arc<dyn LocalStore>,
    items: OutcomeCounter,
    passes: OutcomeCounter,
    last_pass_duration_ms: AtomicU64,
}

impl SyncMetricsRecorder {
    pub fn new(diagnostics: Arc<dyn DiagnosticsStore>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            diagnostics,
            store,
            items: OutcomeCounter::new(),
            passes: OutcomeCounter::new(),
            last_pass_duration_ms: AtomicU64::new(0),
        }
    }

    /// Best effort: a diagnostics write failure never fails the pass.
    pub async fn log_error(&self, draft: ErrorLogDraft) {
        let category = draft.category;
        if let Err(e) = self.diagnostics.append_error(draft).await {
            warn!(target: "fieldsync::sync", %category, error = %e, "failed to persist error log entry");
        }
    }

    pub async fn record_agent_outcome(&self, outcome: AgentOutcome) {
        let agent_type = outcome.agent_type.clone();
        if let Err(e) = self.diagnostics.record_agent_outcome(outcome).await {
            warn!(target: "fieldsync::sync", %agent_type, error = %e, "failed to record agent outcome");
        }
    }

    pub fn record_pass(&self, outcome: &PassOutcome) {
        if !outcome.ran_successfully {
            return;
        }
        self.items.record_success(u64::from(outcome.synced_count));
        self.items.record_failure(u64::from(outcome.failed_count));
        if outcome.all_items_succeeded {
            self.passes.record_success(1);
        } else {
            self.passes.record_failure(1);
        }
        let duration = (outcome.finished_at - outcome.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.last_pass_duration_ms.store(duration, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let items: OutcomeSnapshot = self.items.snapshot();
        let passes = self.passes.snapshot();
        let duration = self.last_pass_duration_ms.load(Ordering::Relaxed);
        SyncMetricsSnapshot {
            passes_succeeded: passes.successes,
            passes_failed: passes.failures,
            items_synced: items.successes,
            items_failed: items.failures,
            consecutive_item_failures: items.consecutive_failures,
            last_pass_duration_ms: (passes.successes + passes.failures > 0).then_some(duration),
            last_success_ms: items.last_success_ms,
            last_failure_ms: items.last_failure_ms,
        }
    }

    /// Health from the current backlog and the item error rate of this process.
    pub async fn health(&self) -> Result<SyncHealthReport, AppError> {
        let counts = self.store.queue_counts().await?;
        let errors_by_category = self.diagnostics.error_counts_by_category().await?;
        let items = self.items.snapshot();
        let attempts = items.successes + items.failures;
        let error_rate = if attempts == 0 {
            0.0
        } else {
            items.failures as f64 / attempts as f64
        };

        Ok(SyncHealthReport {
            label: HealthLabel::assess(counts.pending, error_rate),
            pending_count: counts.pending,
            failed_count: counts.failed,
            error_rate,
            errors_by_category,
        })
    }

    pub async fn recent_errors(&self, limit: u32) -> Result<Vec<ErrorLogEntry>, AppError> {
        self.diagnostics.recent_errors(limit).await
    }

    pub async fn error_counts_by_category(&self) -> Result<Vec<(ErrorKind, u32)>, AppError> {
        self.diagnostics.error_counts_by_category().await
    }

    pub async fn agent_metrics(
        &self,
        agent_type: &str,
        day: NaiveDate,
    ) -> Result<Option<AgentDailyMetric>, AppError> {
        self.diagnostics.agent_metrics(agent_type, day).await
    }
}
