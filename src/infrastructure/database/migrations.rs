use crate::shared::error::AppError;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

/// One idempotent schema change.
#[derive(Debug, Clone, Copy)]
pub enum MigrationStep {
    Sql(&'static str),
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub steps: &'static [MigrationStep],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "entity records and sync queue",
        steps: &[
            MigrationStep::Sql(
                r#"
                CREATE TABLE IF NOT EXISTS entity_records (
                    collection TEXT NOT NULL,
                    local_id TEXT NOT NULL,
                    server_id TEXT,
                    data TEXT NOT NULL,
                    pending_sync INTEGER NOT NULL DEFAULT 1,
                    sync_action TEXT NOT NULL,
                    last_synced_at INTEGER,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (collection, local_id)
                )
                "#,
            ),
            MigrationStep::Sql(
                r#"
                CREATE INDEX IF NOT EXISTS idx_entity_records_pending
                ON entity_records(collection, pending_sync)
                "#,
            ),
            MigrationStep::Sql(
                r#"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_entity_records_server_id
                ON entity_records(collection, server_id)
                WHERE server_id IS NOT NULL
                "#,
            ),
            MigrationStep::Sql(
                r#"
                CREATE TABLE IF NOT EXISTS sync_queue (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    collection TEXT NOT NULL,
                    record_id TEXT NOT NULL,
                    action TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    priority INTEGER NOT NULL DEFAULT 2,
                    enqueued_at INTEGER NOT NULL,
                    retry_count INTEGER NOT NULL DEFAULT 0,
                    last_error TEXT,
                    UNIQUE(collection, record_id)
                )
                "#,
            ),
            MigrationStep::Sql(
                r#"
                CREATE INDEX IF NOT EXISTS idx_sync_queue_order
                ON sync_queue(enqueued_at, id)
                "#,
            ),
        ],
    },
    Migration {
        version: 2,
        description: "error log and agent metrics",
        steps: &[
            MigrationStep::Sql(
                r#"
                CREATE TABLE IF NOT EXISTS error_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    category TEXT NOT NULL,
                    collection TEXT,
                    record_id TEXT,
                    action TEXT,
                    message TEXT NOT NULL,
                    retry_count INTEGER NOT NULL DEFAULT 0,
                    occurred_at INTEGER NOT NULL
                )
                "#,
            ),
            MigrationStep::Sql(
                r#"
                CREATE INDEX IF NOT EXISTS idx_error_log_category
                ON error_log(category, occurred_at)
                "#,
            ),
            MigrationStep::Sql(
                r#"
                CREATE TABLE IF NOT EXISTS agent_daily_metrics (
                    agent_type TEXT NOT NULL,
                    day TEXT NOT NULL,
                    attempted INTEGER NOT NULL DEFAULT 0,
                    succeeded INTEGER NOT NULL DEFAULT 0,
                    failed INTEGER NOT NULL DEFAULT 0,
                    total_latency_ms INTEGER NOT NULL DEFAULT 0,
                    confidence_sum REAL NOT NULL DEFAULT 0,
                    confidence_samples INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (agent_type, day)
                )
                "#,
            ),
        ],
    },
    Migration {
        version: 3,
        description: "soft deletes and persisted sync state",
        steps: &[
            MigrationStep::AddColumn {
                table: "entity_records",
                column: "deleted_at",
                definition: "INTEGER",
            },
            MigrationStep::Sql(
                r#"
                CREATE TABLE IF NOT EXISTS sync_state (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )
                "#,
            ),
        ],
    },
    Migration {
        version: 4,
        description: "queue entry revisions",
        steps: &[MigrationStep::AddColumn {
            table: "sync_queue",
            column: "revision",
            definition: "INTEGER NOT NULL DEFAULT 0",
        }],
    },
];

const CREATE_SCHEMA_VERSION: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY,
        description TEXT NOT NULL,
        applied_at INTEGER NOT NULL
    )
"#;

const SELECT_SCHEMA_VERSION: &str = "SELECT COALESCE(MAX(version), 0) FROM schema_version";

const INSERT_SCHEMA_VERSION: &str = r#"
    INSERT INTO schema_version (version, description, applied_at)
    VALUES (?1, ?2, ?3)
"#;

const SELECT_COLUMN_EXISTS: &str = r#"
    SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2
"#;

pub async fn run(pool: &SqlitePool) -> Result<i64, AppError> {
    apply(pool, MIGRATIONS).await
}

pub async fn apply(pool: &SqlitePool, migrations: &[Migration]) -> Result<i64, AppError> {
    ensure_ordered(migrations)?;

    sqlx::query(CREATE_SCHEMA_VERSION).execute(pool).await?;
    let mut current: i64 = sqlx::query_scalar(SELECT_SCHEMA_VERSION)
        .fetch_one(pool)
        .await?;

    let start = current;
    for migration in migrations.iter().filter(|m| m.version > start) {
        let mut tx = pool.begin().await?;
        for step in migration.steps {
            apply_step(&mut tx, step).await?;
        }
        sqlx::query(INSERT_SCHEMA_VERSION)
            .bind(migration.version)
            .bind(migration.description)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            target: "fieldsync::store",
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
        current = migration.version;
    }

    Ok(current)
}

fn ensure_ordered(migrations: &[Migration]) -> Result<(), AppError> {
    let ordered = migrations
        .windows(2)
        .all(|pair| pair[0].version < pair[1].version);
    if !ordered || migrations.first().is_some_and(|m| m.version <= 0) {
        return Err(AppError::ConfigurationError(
            "Migration versions must be positive and strictly increasing".to_string(),
        ));
    }
    Ok(())
}

async fn apply_step(conn: &mut SqliteConnection, step: &MigrationStep) -> Result<(), AppError> {
    match step {
        MigrationStep::Sql(sql) => {
            sqlx::query(sql).execute(&mut *conn).await?;
        }
        MigrationStep::AddColumn {
            table,
            column,
            definition,
        } => {
            let present: i64 = sqlx::query_scalar(SELECT_COLUMN_EXISTS)
                .bind(*table)
                .bind(*column)
                .fetch_one(&mut *conn)
                .await?;
            if present > 0 {
                debug!(target: "fieldsync::store", table, column, "column already present");
                return Ok(());
            }
            let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");
            sqlx::query(&sql).execute(&mut *conn).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("memory pool")
    }

    #[tokio::test]
    async fn migrations_are_applied_once() {
        let pool = memory_pool().await;

        let first = run(&pool).await.expect("first run");
        let second = run(&pool).await.expect("second run");

        assert_eq!(first, 4);
        assert_eq!(second, 4);
        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(applied, 4);
    }

    #[tokio::test]
    async fn add_column_tolerates_existing_column() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE widgets (id INTEGER PRIMARY KEY, colour TEXT)")
            .execute(&pool)
            .await
            .expect("create");

        const STEPS: &[MigrationStep] = &[MigrationStep::AddColumn {
            table: "widgets",
            column: "colour",
            definition: "TEXT",
        }];
        let migrations = [Migration {
            version: 1,
            description: "widgets colour",
            steps: STEPS,
        }];

        assert_eq!(apply(&pool, &migrations).await.expect("apply"), 1);
    }

    #[tokio::test]
    async fn unordered_versions_are_rejected() {
        let pool = memory_pool().await;
        let migrations = [
            Migration {
                version: 2,
                description: "b",
                steps: &[],
            },
            Migration {
                version: 1,
                description: "a",
                steps: &[],
            },
        ];

        assert!(matches!(
            apply(&pool, &migrations).await,
            Err(AppError::ConfigurationError(_))
        ));
    }
}
