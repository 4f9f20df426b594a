use super::rows::{AgentMetricRow, EntityRecordRow, ErrorLogRow, SyncQueueRow};
use crate::domain::entities::{
    AgentDailyMetric, EntityRecord, ErrorLogEntry, SyncMetadata, SyncQueueEntry,
};
use crate::domain::value_objects::{
    EntityPayload, EntityTable, ErrorKind, LocalId, ServerId, SyncAction, SyncPriority,
    SyncQueueId,
};
use crate::shared::error::AppError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub(super) const DAY_FORMAT: &str = "%Y-%m-%d";

fn decode<T>(result: Result<T, String>) -> Result<T, AppError> {
    result.map_err(AppError::DeserializationError)
}

pub(super) fn millis_to_datetime(value: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| AppError::DeserializationError(format!("Invalid timestamp: {value}")))
}

fn optional_millis(value: Option<i64>) -> Result<Option<DateTime<Utc>>, AppError> {
    value.map(millis_to_datetime).transpose()
}

pub(super) fn record_from_row(row: EntityRecordRow) -> Result<EntityRecord, AppError> {
    let table: EntityTable = decode(row.collection.parse())?;
    let server_id = row.server_id.map(ServerId::new).transpose();

    Ok(EntityRecord {
        local_id: decode(LocalId::new(row.local_id))?,
        table,
        server_id: decode(server_id)?,
        data: decode(EntityPayload::from_json_str(&row.data))?,
        sync: SyncMetadata {
            last_synced_at: optional_millis(row.last_synced_at)?,
            pending_sync: row.pending_sync,
            action: decode(row.sync_action.parse())?,
        },
        created_at: millis_to_datetime(row.created_at)?,
        updated_at: millis_to_datetime(row.updated_at)?,
        deleted_at: optional_millis(row.deleted_at)?,
    })
}

pub(super) fn queue_entry_from_row(row: SyncQueueRow) -> Result<SyncQueueEntry, AppError> {
    Ok(SyncQueueEntry {
        id: decode(SyncQueueId::new(row.id))?,
        table: decode(row.collection.parse())?,
        record_id: decode(LocalId::new(row.record_id))?,
        action: decode(row.action.parse::<SyncAction>())?,
        payload_snapshot: decode(EntityPayload::from_json_str(&row.payload))?,
        priority: SyncPriority::from_rank(row.priority),
        enqueued_at: millis_to_datetime(row.enqueued_at)?,
        retry_count: u32::try_from(row.retry_count).unwrap_or(0),
        last_error: row.last_error,
        revision: row.revision,
    })
}

pub(super) fn error_log_from_row(row: ErrorLogRow) -> Result<ErrorLogEntry, AppError> {
    Ok(ErrorLogEntry {
        id: row.id,
        category: row.category.parse().unwrap_or(ErrorKind::Unknown),
        table: decode(row.collection.map(|c| c.parse::<EntityTable>()).transpose())?,
        record_id: decode(row.record_id.map(LocalId::new).transpose())?,
        action: decode(row.action.map(|a| a.parse::<SyncAction>()).transpose())?,
        message: row.message,
        retry_count: u32::try_from(row.retry_count).unwrap_or(0),
        occurred_at: millis_to_datetime(row.occurred_at)?,
    })
}

pub(super) fn agent_metric_from_row(row: AgentMetricRow) -> Result<AgentDailyMetric, AppError> {
    let day = NaiveDate::parse_from_str(&row.day, DAY_FORMAT)
        .map_err(|err| AppError::DeserializationError(format!("Invalid metric day: {err}")))?;
    let avg_latency_ms = if row.attempted > 0 {
        row.total_latency_ms as f64 / row.attempted as f64
    } else {
        0.0
    };
    let avg_confidence = if row.confidence_samples > 0 {
        Some(row.confidence_sum / row.confidence_samples as f64)
    } else {
        None
    };

    Ok(AgentDailyMetric {
        agent_type: row.agent_type,
        day,
        attempted: u32::try_from(row.attempted).unwrap_or(u32::MAX),
        succeeded: u32::try_from(row.succeeded).unwrap_or(u32::MAX),
        failed: u32::try_from(row.failed).unwrap_or(u32::MAX),
        avg_latency_ms,
        avg_confidence,
    })
}
