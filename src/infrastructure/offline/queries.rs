pub(super) const UPSERT_RECORD: &str = r#"
    INSERT INTO entity_records (
        collection,
        local_id,
        server_id,
        data,
        pending_sync,
        sync_action,
        last_synced_at,
        created_at,
        updated_at,
        deleted_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(collection, local_id) DO UPDATE SET
        server_id = COALESCE(entity_records.server_id, excluded.server_id),
        data = excluded.data,
        pending_sync = excluded.pending_sync,
        sync_action = excluded.sync_action,
        last_synced_at = excluded.last_synced_at,
        updated_at = excluded.updated_at,
        deleted_at = excluded.deleted_at
"#;

pub(super) const SELECT_RECORD: &str = r#"
    SELECT collection, local_id, server_id, data, pending_sync, sync_action,
           last_synced_at, created_at, updated_at, deleted_at
    FROM entity_records
    WHERE collection = ?1 AND local_id = ?2
"#;

pub(super) const SELECT_RECORDS_BY_COLLECTION: &str = r#"
    SELECT collection, local_id, server_id, data, pending_sync, sync_action,
           last_synced_at, created_at, updated_at, deleted_at
    FROM entity_records
    WHERE collection = ?1 AND deleted_at IS NULL
    ORDER BY created_at ASC, local_id ASC
"#;

pub(super) const SELECT_RECORDS_BY_FIELD: &str = r#"
    SELECT collection, local_id, server_id, data, pending_sync, sync_action,
           last_synced_at, created_at, updated_at, deleted_at
    FROM entity_records
    WHERE collection = ?1 AND deleted_at IS NULL AND json_extract(data, ?2) = ?3
    ORDER BY created_at ASC, local_id ASC
"#;

pub(super) const SELECT_PENDING_RECORDS: &str = r#"
    SELECT collection, local_id, server_id, data, pending_sync, sync_action,
           last_synced_at, created_at, updated_at, deleted_at
    FROM entity_records
    WHERE collection = ?1 AND pending_sync = 1 AND deleted_at IS NULL
    ORDER BY updated_at ASC, local_id ASC
"#;

pub(super) const SELECT_RECORD_SERVER_ID: &str = r#"
    SELECT server_id
    FROM entity_records
    WHERE collection = ?1 AND local_id = ?2
"#;

pub(super) const STAMP_SERVER_ID: &str = r#"
    UPDATE entity_records
    SET server_id = COALESCE(server_id, ?3)
    WHERE collection = ?1 AND local_id = ?2
"#;

pub(super) const MARK_RECORD_SYNCED: &str = r#"
    UPDATE entity_records
    SET server_id = COALESCE(server_id, ?3),
        data = ?4,
        pending_sync = 0,
        last_synced_at = ?5
    WHERE collection = ?1 AND local_id = ?2
"#;

pub(super) const MARK_RECORD_EXPIRED: &str = r#"
    UPDATE entity_records
    SET pending_sync = 0,
        last_synced_at = ?3
    WHERE collection = ?1 AND local_id = ?2
"#;

pub(super) const DELETE_RECORD: &str = r#"
    DELETE FROM entity_records
    WHERE collection = ?1 AND local_id = ?2
"#;

pub(super) const SELECT_QUEUE: &str = r#"
    SELECT id, collection, record_id, action, payload, priority, enqueued_at,
           retry_count, last_error, revision
    FROM sync_queue
    ORDER BY enqueued_at ASC, id ASC
"#;

pub(super) const SELECT_QUEUE_ENTRY_BY_RECORD: &str = r#"
    SELECT id, collection, record_id, action, payload, priority, enqueued_at,
           retry_count, last_error, revision
    FROM sync_queue
    WHERE collection = ?1 AND record_id = ?2
"#;

pub(super) const SELECT_QUEUE_REVISION: &str = r#"
    SELECT revision, action
    FROM sync_queue
    WHERE id = ?1
"#;

pub(super) const INSERT_QUEUE_ENTRY: &str = r#"
    INSERT INTO sync_queue (
        collection,
        record_id,
        action,
        payload,
        priority,
        enqueued_at,
        retry_count,
        last_error,
        revision
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, 0)
"#;

pub(super) const REPLACE_QUEUE_SNAPSHOT: &str = r#"
    UPDATE sync_queue
    SET action = ?2,
        payload = ?3,
        priority = MIN(priority, ?4),
        retry_count = 0,
        last_error = NULL,
        revision = revision + 1
    WHERE id = ?1
"#;

pub(super) const CONVERT_QUEUE_CREATE_TO_UPDATE: &str = r#"
    UPDATE sync_queue
    SET action = 'update'
    WHERE id = ?1 AND action = 'create'
"#;

pub(super) const MARK_QUEUE_FAILED: &str = r#"
    UPDATE sync_queue
    SET retry_count = retry_count + 1,
        last_error = ?2
    WHERE id = ?1
    RETURNING retry_count
"#;

pub(super) const PRIORITIZE_QUEUE_ENTRY: &str = r#"
    UPDATE sync_queue
    SET priority = ?2,
        retry_count = 0,
        last_error = NULL
    WHERE id = ?1
"#;

pub(super) const DELETE_QUEUE_ENTRY: &str = r#"
    DELETE FROM sync_queue
    WHERE id = ?1
"#;

pub(super) const DELETE_QUEUE_ENTRY_BY_RECORD: &str = r#"
    DELETE FROM sync_queue
    WHERE collection = ?1 AND record_id = ?2
"#;

pub(super) const SELECT_QUEUE_COUNTS: &str = r#"
    SELECT COUNT(*) AS pending,
           COALESCE(SUM(CASE WHEN retry_count > 0 THEN 1 ELSE 0 END), 0) AS failed
    FROM sync_queue
"#;

pub(super) const SELECT_SYNC_STATE: &str = r#"
    SELECT value FROM sync_state WHERE key = ?1
"#;

pub(super) const UPSERT_SYNC_STATE: &str = r#"
    INSERT INTO sync_state (key, value)
    VALUES (?1, ?2)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#;

pub(super) const INSERT_ERROR_LOG: &str = r#"
    INSERT INTO error_log (
        category,
        collection,
        record_id,
        action,
        message,
        retry_count,
        occurred_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

pub(super) const SELECT_RECENT_ERRORS: &str = r#"
    SELECT id, category, collection, record_id, action, message, retry_count, occurred_at
    FROM error_log
    ORDER BY occurred_at DESC, id DESC
    LIMIT ?1
"#;

pub(super) const SELECT_ERROR_COUNTS: &str = r#"
    SELECT category, COUNT(*) AS total
    FROM error_log
    GROUP BY category
    ORDER BY total DESC, category ASC
"#;

pub(super) const UPSERT_AGENT_OUTCOME: &str = r#"
    INSERT INTO agent_daily_metrics (
        agent_type,
        day,
        attempted,
        succeeded,
        failed,
        total_latency_ms,
        confidence_sum,
        confidence_samples
    ) VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(agent_type, day) DO UPDATE SET
        attempted = attempted + 1,
        succeeded = succeeded + excluded.succeeded,
        failed = failed + excluded.failed,
        total_latency_ms = total_latency_ms + excluded.total_latency_ms,
        confidence_sum = confidence_sum + excluded.confidence_sum,
        confidence_samples = confidence_samples + excluded.confidence_samples
"#;

pub(super) const SELECT_AGENT_METRICS: &str = r#"
    SELECT agent_type, day, attempted, succeeded, failed, total_latency_ms,
           confidence_sum, confidence_samples
    FROM agent_daily_metrics
    WHERE agent_type = ?1 AND day = ?2
"#;
