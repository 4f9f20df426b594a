use super::mappers::{
    DAY_FORMAT, agent_metric_from_row, error_log_from_row, millis_to_datetime,
    queue_entry_from_row, record_from_row,
};
use super::queries::{
    CONVERT_QUEUE_CREATE_TO_UPDATE, DELETE_QUEUE_ENTRY, DELETE_QUEUE_ENTRY_BY_RECORD,
    DELETE_RECORD, INSERT_ERROR_LOG, INSERT_QUEUE_ENTRY, MARK_QUEUE_FAILED, MARK_RECORD_EXPIRED,
    MARK_RECORD_SYNCED, PRIORITIZE_QUEUE_ENTRY, REPLACE_QUEUE_SNAPSHOT, SELECT_AGENT_METRICS,
    SELECT_ERROR_COUNTS, SELECT_PENDING_RECORDS, SELECT_QUEUE, SELECT_QUEUE_COUNTS,
    SELECT_QUEUE_ENTRY_BY_RECORD, SELECT_QUEUE_REVISION, SELECT_RECENT_ERRORS, SELECT_RECORD,
    SELECT_RECORD_SERVER_ID, SELECT_RECORDS_BY_COLLECTION, SELECT_RECORDS_BY_FIELD,
    SELECT_SYNC_STATE, STAMP_SERVER_ID, UPSERT_AGENT_OUTCOME, UPSERT_RECORD, UPSERT_SYNC_STATE,
};
use super::rows::{
    AgentMetricRow, EntityRecordRow, ErrorCountRow, ErrorLogRow, QueueCountsRow,
    QueueRevisionRow, SyncQueueRow,
};
use crate::application::ports::{
    AckOutcome, DiagnosticsStore, LocalStore, QueueAck, QueueCounts, RecordWrite, WriteOutcome,
};
use crate::domain::entities::{
    AgentDailyMetric, AgentOutcome, EntityRecord, ErrorLogDraft, ErrorLogEntry, QueueMerge,
    SyncQueueEntry,
};
use crate::domain::value_objects::{
    EntityPayload, EntityTable, ErrorKind, LocalId, SyncAction, SyncPriority, SyncQueueId,
};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::config::DatabaseConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::debug;

const LAST_SYNC_KEY: &str = "last_sync_at";

/// SQLite-backed record store, sync queue and diagnostics tables.
#[derive(Clone)]
pub struct SqliteLocalStore {
    pool: ConnectionPool,
}

impl SqliteLocalStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = ConnectionPool::from_config(config).await?;
        pool.migrate().await?;
        Ok(Self::new(pool))
    }

    pub async fn in_memory() -> Result<Self, AppError> {
        let pool = ConnectionPool::from_memory().await?;
        pool.migrate().await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

async fn upsert_record(conn: &mut SqliteConnection, record: &EntityRecord) -> Result<(), AppError> {
    sqlx::query(UPSERT_RECORD)
        .bind(record.table.as_str())
        .bind(record.local_id.as_str())
        .bind(record.server_id.as_ref().map(|id| id.as_str()))
        .bind(record.data.to_json_string()?)
        .bind(record.sync.pending_sync)
        .bind(record.sync.action.as_str())
        .bind(record.sync.last_synced_at.map(|at| at.timestamp_millis()))
        .bind(record.created_at.timestamp_millis())
        .bind(record.updated_at.timestamp_millis())
        .bind(record.deleted_at.map(|at| at.timestamp_millis()))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn fetch_queue_row(
    conn: &mut SqliteConnection,
    table: EntityTable,
    record_id: &LocalId,
) -> Result<Option<SyncQueueRow>, AppError> {
    let row = sqlx::query_as::<_, SyncQueueRow>(SELECT_QUEUE_ENTRY_BY_RECORD)
        .bind(table.as_str())
        .bind(record_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn fetch_record_row(
    conn: &mut SqliteConnection,
    table: EntityTable,
    record_id: &LocalId,
) -> Result<Option<EntityRecordRow>, AppError> {
    let row = sqlx::query_as::<_, EntityRecordRow>(SELECT_RECORD)
        .bind(table.as_str())
        .bind(record_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn insert_queue_entry(
    conn: &mut SqliteConnection,
    table: EntityTable,
    record_id: &LocalId,
    action: SyncAction,
    payload: &EntityPayload,
    priority: SyncPriority,
) -> Result<(), AppError> {
    sqlx::query(INSERT_QUEUE_ENTRY)
        .bind(table.as_str())
        .bind(record_id.as_str())
        .bind(action.as_str())
        .bind(payload.to_json_string()?)
        .bind(priority.rank())
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn remove_record_and_entry(
    conn: &mut SqliteConnection,
    table: EntityTable,
    record_id: &LocalId,
) -> Result<(), AppError> {
    sqlx::query(DELETE_QUEUE_ENTRY_BY_RECORD)
        .bind(table.as_str())
        .bind(record_id.as_str())
        .execute(&mut *conn)
        .await?;
    sqlx::query(DELETE_RECORD)
        .bind(table.as_str())
        .bind(record_id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Persists the record and folds its mutation into the queue. Runs inside the
/// caller's transaction.
async fn apply_write(
    conn: &mut SqliteConnection,
    write: RecordWrite,
) -> Result<WriteOutcome, AppError> {
    let RecordWrite { mut record, enqueue } = write;
    let Some(draft) = enqueue else {
        upsert_record(conn, &record).await?;
        return Ok(WriteOutcome::Stored(None));
    };

    // Read identity inside the transaction; an ack may have landed since the caller loaded it.
    let stored_server_id: Option<Option<String>> = sqlx::query_scalar(SELECT_RECORD_SERVER_ID)
        .bind(draft.table.as_str())
        .bind(draft.record_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    let known_remotely =
        record.server_id.is_some() || stored_server_id.flatten().is_some();

    let existing = fetch_queue_row(conn, draft.table, &draft.record_id).await?;
    let existing_action = existing
        .as_ref()
        .map(|row| row.action.parse::<SyncAction>())
        .transpose()
        .map_err(AppError::DeserializationError)?;

    let merge = match QueueMerge::resolve(existing_action, draft.action) {
        QueueMerge::Cancel if known_remotely => QueueMerge::Replace(SyncAction::Delete),
        // The remote never saw this record, so it can only be created or forgotten.
        QueueMerge::Insert(SyncAction::Delete) | QueueMerge::Replace(SyncAction::Delete)
            if !known_remotely =>
        {
            QueueMerge::Cancel
        }
        QueueMerge::Insert(SyncAction::Update) if !known_remotely => {
            QueueMerge::Insert(SyncAction::Create)
        }
        QueueMerge::Replace(SyncAction::Update) if !known_remotely => {
            QueueMerge::Replace(SyncAction::Create)
        }
        other => other,
    };

    match merge {
        QueueMerge::Cancel => {
            remove_record_and_entry(conn, draft.table, &draft.record_id).await?;
            debug!(
                target: "fieldsync::store",
                table = %draft.table,
                record_id = %draft.record_id,
                "unsynced record removed locally"
            );
            Ok(WriteOutcome::Cancelled)
        }
        QueueMerge::Insert(action) => {
            record.sync.action = action;
            upsert_record(conn, &record).await?;
            insert_queue_entry(
                conn,
                draft.table,
                &draft.record_id,
                action,
                &draft.payload_snapshot,
                draft.priority,
            )
            .await?;
            Ok(WriteOutcome::Stored(Some(merge)))
        }
        QueueMerge::Replace(action) => {
            record.sync.action = action;
            upsert_record(conn, &record).await?;
            match existing {
                Some(row) => {
                    sqlx::query(REPLACE_QUEUE_SNAPSHOT)
                        .bind(row.id)
                        .bind(action.as_str())
                        .bind(draft.payload_snapshot.to_json_string()?)
                        .bind(draft.priority.rank())
                        .execute(&mut *conn)
                        .await?;
                }
                None => {
                    insert_queue_entry(
                        conn,
                        draft.table,
                        &draft.record_id,
                        action,
                        &draft.payload_snapshot,
                        draft.priority,
                    )
                    .await?;
                }
            }
            Ok(WriteOutcome::Stored(Some(merge)))
        }
    }
}

fn json_path(field: &str) -> Result<String, AppError> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(AppError::InvalidInput(format!(
            "Unsupported field name for lookup: {field}"
        )));
    }
    Ok(format!("$.\"{field}\""))
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn load_record(
        &self,
        table: EntityTable,
        id: &LocalId,
    ) -> Result<Option<EntityRecord>, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        fetch_record_row(&mut conn, table, id)
            .await?
            .map(record_from_row)
            .transpose()
    }

    async fn list_records(&self, table: EntityTable) -> Result<Vec<EntityRecord>, AppError> {
        let rows = sqlx::query_as::<_, EntityRecordRow>(SELECT_RECORDS_BY_COLLECTION)
            .bind(table.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(record_from_row).collect()
    }

    async fn find_records_by_field(
        &self,
        table: EntityTable,
        field: &str,
        value: &Value,
    ) -> Result<Vec<EntityRecord>, AppError> {
        let path = json_path(field)?;
        let query = sqlx::query_as::<_, EntityRecordRow>(SELECT_RECORDS_BY_FIELD)
            .bind(table.as_str())
            .bind(path);
        let query = match value {
            Value::String(s) => query.bind(s.clone()),
            Value::Bool(b) => query.bind(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64().unwrap_or_default()),
            },
            other => {
                return Err(AppError::InvalidInput(format!(
                    "Field lookups support strings, numbers and booleans (got {other})"
                )));
            }
        };
        let rows = query.fetch_all(self.pool.get_pool()).await?;
        rows.into_iter().map(record_from_row).collect()
    }

    async fn pending_records(&self, table: EntityTable) -> Result<Vec<EntityRecord>, AppError> {
        let rows = sqlx::query_as::<_, EntityRecordRow>(SELECT_PENDING_RECORDS)
            .bind(table.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(record_from_row).collect()
    }

    async fn write_record(&self, write: RecordWrite) -> Result<WriteOutcome, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        let outcome = apply_write(&mut tx, write).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn write_records(&self, writes: Vec<RecordWrite>) -> Result<usize, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        let mut stored = 0;
        for write in writes {
            if let WriteOutcome::Stored(_) = apply_write(&mut tx, write).await? {
                stored += 1;
            }
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn remove_record(&self, table: EntityTable, id: &LocalId) -> Result<(), AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        remove_record_and_entry(&mut tx, table, id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn dequeue_all(&self) -> Result<Vec<SyncQueueEntry>, AppError> {
        let rows = sqlx::query_as::<_, SyncQueueRow>(SELECT_QUEUE)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(queue_entry_from_row).collect()
    }

    async fn queue_entry(
        &self,
        table: EntityTable,
        record_id: &LocalId,
    ) -> Result<Option<SyncQueueEntry>, AppError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        fetch_queue_row(&mut conn, table, record_id)
            .await?
            .map(queue_entry_from_row)
            .transpose()
    }

    async fn acknowledge(&self, ack: QueueAck) -> Result<AckOutcome, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        let current = sqlx::query_as::<_, QueueRevisionRow>(SELECT_QUEUE_REVISION)
            .bind(ack.entry_id.value())
            .fetch_optional(&mut *tx)
            .await?;
        let server_id = ack.server_id.as_ref().map(|id| id.as_str());

        let outcome = match current {
            None => {
                if server_id.is_some() {
                    sqlx::query(STAMP_SERVER_ID)
                        .bind(ack.table.as_str())
                        .bind(ack.record_id.as_str())
                        .bind(server_id)
                        .execute(&mut *tx)
                        .await?;
                }
                AckOutcome::Missing
            }
            Some(row) if row.revision != ack.revision => {
                if server_id.is_some() {
                    sqlx::query(STAMP_SERVER_ID)
                        .bind(ack.table.as_str())
                        .bind(ack.record_id.as_str())
                        .bind(server_id)
                        .execute(&mut *tx)
                        .await?;
                    sqlx::query(CONVERT_QUEUE_CREATE_TO_UPDATE)
                        .bind(ack.entry_id.value())
                        .execute(&mut *tx)
                        .await?;
                }
                debug!(
                    target: "fieldsync::store",
                    entry_id = %ack.entry_id,
                    acked_revision = ack.revision,
                    current_revision = row.revision,
                    queued_action = %row.action,
                    "ack superseded by newer mutation"
                );
                AckOutcome::Superseded
            }
            Some(_) => {
                if ack.action == SyncAction::Delete {
                    sqlx::query(DELETE_RECORD)
                        .bind(ack.table.as_str())
                        .bind(ack.record_id.as_str())
                        .execute(&mut *tx)
                        .await?;
                } else if let Some(row) = fetch_record_row(&mut tx, ack.table, &ack.record_id).await?
                {
                    let mut data = EntityPayload::from_json_str(&row.data)
                        .map_err(AppError::DeserializationError)?;
                    if let Some(fields) = &ack.remote_fields {
                        data.merge(fields);
                    }
                    sqlx::query(MARK_RECORD_SYNCED)
                        .bind(ack.table.as_str())
                        .bind(ack.record_id.as_str())
                        .bind(server_id)
                        .bind(data.to_json_string()?)
                        .bind(Utc::now().timestamp_millis())
                        .execute(&mut *tx)
                        .await?;
                }
                sqlx::query(DELETE_QUEUE_ENTRY)
                    .bind(ack.entry_id.value())
                    .execute(&mut *tx)
                    .await?;
                AckOutcome::Completed
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn mark_failed(&self, id: SyncQueueId, error: &str) -> Result<u32, AppError> {
        let retry_count: Option<i64> = sqlx::query_scalar(MARK_QUEUE_FAILED)
            .bind(id.value())
            .bind(error)
            .fetch_optional(self.pool.get_pool())
            .await?;
        let retry_count = retry_count.ok_or_else(|| AppError::not_found("sync_queue", &id.to_string()))?;
        Ok(u32::try_from(retry_count).unwrap_or(u32::MAX))
    }

    async fn purge(&self, id: SyncQueueId) -> Result<(), AppError> {
        sqlx::query(DELETE_QUEUE_ENTRY)
            .bind(id.value())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn expire(
        &self,
        id: SyncQueueId,
        table: EntityTable,
        record_id: &LocalId,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        sqlx::query(DELETE_QUEUE_ENTRY)
            .bind(id.value())
            .execute(&mut *tx)
            .await?;
        sqlx::query(MARK_RECORD_EXPIRED)
            .bind(table.as_str())
            .bind(record_id.as_str())
            .bind(Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn prioritize(&self, table: EntityTable, record_id: &LocalId) -> Result<bool, AppError> {
        let mut tx = self.pool.get_pool().begin().await?;

        if let Some(row) = fetch_queue_row(&mut tx, table, record_id).await? {
            sqlx::query(PRIORITIZE_QUEUE_ENTRY)
                .bind(row.id)
                .bind(SyncPriority::Critical.rank())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(true);
        }

        let record = match fetch_record_row(&mut tx, table, record_id).await? {
            Some(row) if row.pending_sync => record_from_row(row)?,
            _ => return Ok(false),
        };
        let action = match (record.server_id.is_some(), record.sync.action) {
            (false, SyncAction::Delete) => {
                remove_record_and_entry(&mut tx, table, record_id).await?;
                tx.commit().await?;
                return Ok(false);
            }
            (false, _) => SyncAction::Create,
            (true, action) => action,
        };
        insert_queue_entry(
            &mut tx,
            table,
            record_id,
            action,
            &record.data,
            SyncPriority::Critical,
        )
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn queue_counts(&self) -> Result<QueueCounts, AppError> {
        let row = sqlx::query_as::<_, QueueCountsRow>(SELECT_QUEUE_COUNTS)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(QueueCounts {
            pending: u32::try_from(row.pending).unwrap_or(u32::MAX),
            failed: u32::try_from(row.failed).unwrap_or(u32::MAX),
        })
    }

    async fn last_sync_at(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let value: Option<String> = sqlx::query_scalar(SELECT_SYNC_STATE)
            .bind(LAST_SYNC_KEY)
            .fetch_optional(self.pool.get_pool())
            .await?;
        value
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|err| {
                        AppError::DeserializationError(format!("Invalid {LAST_SYNC_KEY}: {err}"))
                    })
                    .and_then(millis_to_datetime)
            })
            .transpose()
    }

    async fn set_last_sync_at(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(UPSERT_SYNC_STATE)
            .bind(LAST_SYNC_KEY)
            .bind(at.timestamp_millis().to_string())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DiagnosticsStore for SqliteLocalStore {
    async fn append_error(&self, draft: ErrorLogDraft) -> Result<i64, AppError> {
        let result = sqlx::query(INSERT_ERROR_LOG)
            .bind(draft.category.as_str())
            .bind(draft.table.map(|t| t.as_str()))
            .bind(draft.record_id.as_ref().map(|id| id.as_str()))
            .bind(draft.action.map(|a| a.as_str()))
            .bind(&draft.message)
            .bind(i64::from(draft.retry_count))
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn recent_errors(&self, limit: u32) -> Result<Vec<ErrorLogEntry>, AppError> {
        let rows = sqlx::query_as::<_, ErrorLogRow>(SELECT_RECENT_ERRORS)
            .bind(i64::from(limit))
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(error_log_from_row).collect()
    }

    async fn error_counts_by_category(&self) -> Result<Vec<(ErrorKind, u32)>, AppError> {
        let rows = sqlx::query_as::<_, ErrorCountRow>(SELECT_ERROR_COUNTS)
            .fetch_all(self.pool.get_pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.category.parse().unwrap_or(ErrorKind::Unknown),
                    u32::try_from(row.total).unwrap_or(u32::MAX),
                )
            })
            .collect())
    }

    async fn record_agent_outcome(&self, outcome: AgentOutcome) -> Result<(), AppError> {
        sqlx::query(UPSERT_AGENT_OUTCOME)
            .bind(&outcome.agent_type)
            .bind(outcome.day.format(DAY_FORMAT).to_string())
            .bind(i64::from(outcome.succeeded))
            .bind(i64::from(!outcome.succeeded))
            .bind(i64::try_from(outcome.latency_ms).unwrap_or(i64::MAX))
            .bind(outcome.confidence.unwrap_or(0.0))
            .bind(i64::from(outcome.confidence.is_some()))
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn agent_metrics(
        &self,
        agent_type: &str,
        day: NaiveDate,
    ) -> Result<Option<AgentDailyMetric>, AppError> {
        let row = sqlx::query_as::<_, AgentMetricRow>(SELECT_AGENT_METRICS)
            .bind(agent_type)
            .bind(day.format(DAY_FORMAT).to_string())
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(agent_metric_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{SyncMetadata, SyncQueueDraft};
    use crate::domain::value_objects::ServerId;
    use serde_json::json;

    async fn setup_store() -> SqliteLocalStore {
        SqliteLocalStore::in_memory().await.expect("store")
    }

    fn record(table: EntityTable, data: Value, action: SyncAction) -> EntityRecord {
        let now = Utc::now();
        EntityRecord {
            local_id: LocalId::generate(),
            table,
            server_id: None,
            data: EntityPayload::new(data).expect("object"),
            sync: SyncMetadata::pending(action),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn queued(record: &EntityRecord, action: SyncAction) -> RecordWrite {
        RecordWrite {
            record: record.clone(),
            enqueue: Some(SyncQueueDraft::new(
                record.table,
                record.local_id.clone(),
                action,
                record.data.clone(),
                SyncPriority::Normal,
            )),
        }
    }

    #[tokio::test]
    async fn write_persists_record_and_queue_entry_together() {
        let store = setup_store().await;
        let lot = record(EntityTable::Lots, json!({"name": "Lote A"}), SyncAction::Create);

        let outcome = store
            .write_record(queued(&lot, SyncAction::Create))
            .await
            .expect("write");

        assert_eq!(
            outcome,
            WriteOutcome::Stored(Some(QueueMerge::Insert(SyncAction::Create)))
        );
        let loaded = store
            .load_record(EntityTable::Lots, &lot.local_id)
            .await
            .expect("load")
            .expect("present");
        assert!(loaded.pending_sync());
        let queue = store.dequeue_all().await.expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].record_id, lot.local_id);
        assert_eq!(queue[0].revision, 0);
    }

    #[tokio::test]
    async fn update_collapses_into_pending_create() {
        let store = setup_store().await;
        let mut lot = record(EntityTable::Lots, json!({"name": "Lote A"}), SyncAction::Create);
        store
            .write_record(queued(&lot, SyncAction::Create))
            .await
            .expect("create");
        let original = store.dequeue_all().await.expect("queue").remove(0);

        lot.data = EntityPayload::new(json!({"name": "Lote B"})).expect("object");
        store
            .write_record(queued(&lot, SyncAction::Update))
            .await
            .expect("update");

        let queue = store.dequeue_all().await.expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, original.id);
        assert_eq!(queue[0].action, SyncAction::Create);
        assert_eq!(queue[0].revision, 1);
        assert_eq!(queue[0].payload_snapshot.get_str("name"), Some("Lote B"));
    }

    #[tokio::test]
    async fn deleting_unsynced_record_cancels_everything() {
        let store = setup_store().await;
        let task = record(EntityTable::Tasks, json!({"title": "Spray"}), SyncAction::Create);
        store
            .write_record(queued(&task, SyncAction::Create))
            .await
            .expect("create");

        let outcome = store
            .write_record(queued(&task, SyncAction::Delete))
            .await
            .expect("delete");

        assert_eq!(outcome, WriteOutcome::Cancelled);
        assert!(store.dequeue_all().await.expect("queue").is_empty());
        assert!(store
            .load_record(EntityTable::Tasks, &task.local_id)
            .await
            .expect("load")
            .is_none());
    }

    #[tokio::test]
    async fn ack_with_matching_revision_completes_entry() {
        let store = setup_store().await;
        let lot = record(EntityTable::Lots, json!({"name": "Lote A"}), SyncAction::Create);
        store
            .write_record(queued(&lot, SyncAction::Create))
            .await
            .expect("create");
        let entry = store.dequeue_all().await.expect("queue").remove(0);

        let outcome = store
            .acknowledge(QueueAck {
                entry_id: entry.id,
                revision: entry.revision,
                table: entry.table,
                record_id: entry.record_id.clone(),
                action: entry.action,
                server_id: Some(ServerId::new("srv-1".to_string()).expect("id")),
                remote_fields: Some(
                    EntityPayload::new(json!({"updatedBy": "server"})).expect("object"),
                ),
            })
            .await
            .expect("ack");

        assert_eq!(outcome, AckOutcome::Completed);
        let synced = store
            .load_record(EntityTable::Lots, &lot.local_id)
            .await
            .expect("load")
            .expect("present");
        assert!(!synced.pending_sync());
        assert_eq!(synced.server_id.as_ref().map(|id| id.as_str()), Some("srv-1"));
        assert_eq!(synced.data.get_str("updatedBy"), Some("server"));
        assert!(synced.sync.last_synced_at.is_some());
        assert!(store.dequeue_all().await.expect("queue").is_empty());
    }

    #[tokio::test]
    async fn ack_after_newer_mutation_keeps_entry_as_update() {
        let store = setup_store().await;
        let mut lot = record(EntityTable::Lots, json!({"name": "Lote A"}), SyncAction::Create);
        store
            .write_record(queued(&lot, SyncAction::Create))
            .await
            .expect("create");
        let dispatched = store.dequeue_all().await.expect("queue").remove(0);

        lot.data = EntityPayload::new(json!({"name": "Lote A2"})).expect("object");
        store
            .write_record(queued(&lot, SyncAction::Update))
            .await
            .expect("update during dispatch");

        let outcome = store
            .acknowledge(QueueAck {
                entry_id: dispatched.id,
                revision: dispatched.revision,
                table: dispatched.table,
                record_id: dispatched.record_id.clone(),
                action: dispatched.action,
                server_id: Some(ServerId::new("srv-7".to_string()).expect("id")),
                remote_fields: None,
            })
            .await
            .expect("ack");

        assert_eq!(outcome, AckOutcome::Superseded);
        let queue = store.dequeue_all().await.expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].action, SyncAction::Update);
        let stored = store
            .load_record(EntityTable::Lots, &lot.local_id)
            .await
            .expect("load")
            .expect("present");
        assert!(stored.pending_sync());
        assert_eq!(stored.server_id.as_ref().map(|id| id.as_str()), Some("srv-7"));
    }

    #[tokio::test]
    async fn failures_count_and_prioritize_resets_budget() {
        let store = setup_store().await;
        let expense = record(EntityTable::Expenses, json!({"amount": 40}), SyncAction::Create);
        store
            .write_record(queued(&expense, SyncAction::Create))
            .await
            .expect("create");
        let entry = store.dequeue_all().await.expect("queue").remove(0);

        assert_eq!(store.mark_failed(entry.id, "boom").await.expect("fail"), 1);
        assert_eq!(store.mark_failed(entry.id, "boom").await.expect("fail"), 2);
        let counts = store.queue_counts().await.expect("counts");
        assert_eq!(counts, QueueCounts { pending: 1, failed: 1 });

        store.purge(entry.id).await.expect("purge");
        assert!(store.dequeue_all().await.expect("queue").is_empty());

        assert!(store
            .prioritize(EntityTable::Expenses, &expense.local_id)
            .await
            .expect("prioritize"));
        let requeued = store.dequeue_all().await.expect("queue").remove(0);
        assert_eq!(requeued.priority, SyncPriority::Critical);
        assert_eq!(requeued.retry_count, 0);
        assert_eq!(requeued.action, SyncAction::Create);
    }

    #[tokio::test]
    async fn update_after_purged_create_is_still_a_create() {
        let store = setup_store().await;
        let mut lot = record(EntityTable::Lots, json!({"name": "Lote A"}), SyncAction::Create);
        store
            .write_record(queued(&lot, SyncAction::Create))
            .await
            .expect("create");
        let entry = store.dequeue_all().await.expect("queue").remove(0);
        store.purge(entry.id).await.expect("purge");

        lot.data = EntityPayload::new(json!({"name": "Lote B"})).expect("object");
        lot.sync = SyncMetadata::pending(SyncAction::Update);
        let outcome = store
            .write_record(queued(&lot, SyncAction::Update))
            .await
            .expect("update");

        assert_eq!(
            outcome,
            WriteOutcome::Stored(Some(QueueMerge::Insert(SyncAction::Create)))
        );
        let queue = store.dequeue_all().await.expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].action, SyncAction::Create);
        assert_eq!(queue[0].payload_snapshot.get_str("name"), Some("Lote B"));
        let stored = store
            .load_record(EntityTable::Lots, &lot.local_id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(stored.sync.action, SyncAction::Create);

        store.purge(queue[0].id).await.expect("purge");
        assert!(store
            .prioritize(EntityTable::Lots, &lot.local_id)
            .await
            .expect("prioritize"));
        let requeued = store.dequeue_all().await.expect("queue").remove(0);
        assert_eq!(requeued.action, SyncAction::Create);
    }

    #[tokio::test]
    async fn prioritize_turns_stale_update_without_server_id_into_create() {
        let store = setup_store().await;
        let task = record(EntityTable::Tasks, json!({"title": "Spray"}), SyncAction::Update);
        store
            .write_record(RecordWrite {
                record: task.clone(),
                enqueue: None,
            })
            .await
            .expect("store");

        assert!(store
            .prioritize(EntityTable::Tasks, &task.local_id)
            .await
            .expect("prioritize"));
        let entry = store.dequeue_all().await.expect("queue").remove(0);
        assert_eq!(entry.action, SyncAction::Create);
        assert_eq!(entry.priority, SyncPriority::Critical);
    }

    #[tokio::test]
    async fn local_only_tables_are_never_queued() {
        let store = setup_store().await;
        let session = record(EntityTable::Sessions, json!({"user": "ana"}), SyncAction::Create);
        store
            .write_record(RecordWrite {
                record: session.clone(),
                enqueue: None,
            })
            .await
            .expect("write");

        assert!(store.dequeue_all().await.expect("queue").is_empty());
        assert_eq!(store.list_records(EntityTable::Sessions).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn find_by_field_matches_json_values() {
        let store = setup_store().await;
        let a = record(EntityTable::Harvests, json!({"crop": "maize", "bags": 12}), SyncAction::Create);
        let b = record(EntityTable::Harvests, json!({"crop": "beans", "bags": 4}), SyncAction::Create);
        store
            .write_records(vec![queued(&a, SyncAction::Create), queued(&b, SyncAction::Create)])
            .await
            .expect("bulk");

        let maize = store
            .find_records_by_field(EntityTable::Harvests, "crop", &json!("maize"))
            .await
            .expect("find");
        assert_eq!(maize.len(), 1);
        assert_eq!(maize[0].local_id, a.local_id);

        let four = store
            .find_records_by_field(EntityTable::Harvests, "bags", &json!(4))
            .await
            .expect("find");
        assert_eq!(four[0].local_id, b.local_id);

        assert!(store
            .find_records_by_field(EntityTable::Harvests, "crop') OR 1=1 --", &json!("x"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn last_sync_timestamp_round_trips() {
        let store = setup_store().await;
        assert!(store.last_sync_at().await.expect("read").is_none());

        let now = Utc::now();
        store.set_last_sync_at(now).await.expect("write");

        let stored = store.last_sync_at().await.expect("read").expect("present");
        assert_eq!(stored.timestamp_millis(), now.timestamp_millis());
    }

    #[tokio::test]
    async fn diagnostics_are_aggregated() {
        let store = setup_store().await;
        for category in [ErrorKind::Network, ErrorKind::Network, ErrorKind::Auth] {
            store
                .append_error(ErrorLogDraft {
                    category,
                    table: Some(EntityTable::Expenses),
                    record_id: None,
                    action: Some(SyncAction::Update),
                    message: "failed".to_string(),
                    retry_count: 3,
                })
                .await
                .expect("append");
        }

        let counts = store.error_counts_by_category().await.expect("counts");
        assert_eq!(counts[0], (ErrorKind::Network, 2));
        assert_eq!(store.recent_errors(2).await.expect("recent").len(), 2);

        let day = NaiveDate::from_ymd_opt(2024, 5, 1).expect("date");
        for (succeeded, latency, confidence) in [(true, 100, Some(0.9)), (false, 300, None)] {
            store
                .record_agent_outcome(AgentOutcome {
                    agent_type: "pest_detection".to_string(),
                    succeeded,
                    latency_ms: latency,
                    confidence,
                    day,
                })
                .await
                .expect("outcome");
        }
        let metric = store
            .agent_metrics("pest_detection", day)
            .await
            .expect("metrics")
            .expect("present");
        assert_eq!(metric.attempted, 2);
        assert_eq!(metric.failed, 1);
        assert_eq!(metric.avg_latency_ms, 200.0);
        assert_eq!(metric.avg_confidence, Some(0.9));
    }
}
