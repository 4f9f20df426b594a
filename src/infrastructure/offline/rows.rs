use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct EntityRecordRow {
    pub collection: String,
    pub local_id: String,
    pub server_id: Option<String>,
    pub data: String,
    pub pending_sync: bool,
    pub sync_action: String,
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncQueueRow {
    pub id: i64,
    pub collection: String,
    pub record_id: String,
    pub action: String,
    pub payload: String,
    pub priority: i64,
    pub enqueued_at: i64,
    pub retry_count: i64,
    pub last_error: Option<String>,
    pub revision: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct QueueRevisionRow {
    pub revision: i64,
    pub action: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct QueueCountsRow {
    pub pending: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ErrorLogRow {
    pub id: i64,
    pub category: String,
    pub collection: Option<String>,
    pub record_id: Option<String>,
    pub action: Option<String>,
    pub message: String,
    pub retry_count: i64,
    pub occurred_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ErrorCountRow {
    pub category: String,
    pub total: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct AgentMetricRow {
    pub agent_type: String,
    pub day: String,
    pub attempted: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub total_latency_ms: i64,
    pub confidence_sum: f64,
    pub confidence_samples: i64,
}
