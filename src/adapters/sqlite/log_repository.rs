//! SQLite implementation of the processing-log store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{LogEntry, LogEventType};
use crate::domain::ports::LogRepository;

#[derive(Clone)]
pub struct SqliteLogRepository {
    pool: SqlitePool,
}

impl SqliteLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    document_id: i64,
    timestamp: String,
    step: String,
    event: String,
    payload: String,
    parent_id: Option<String>,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = CoreError;

    fn try_from(row: LogRow) -> CoreResult<Self> {
        Ok(LogEntry {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| CoreError::Database(format!("bad log id: {e}")))?,
            document_id: row.document_id,
            timestamp: DateTime::parse_from_rfc3339(&row.timestamp)
                .map_err(|e| CoreError::Database(format!("bad log timestamp: {e}")))?
                .with_timezone(&Utc),
            step: row.step,
            event: LogEventType::parse(&row.event)
                .ok_or_else(|| CoreError::Database(format!("bad log event '{}'", row.event)))?,
            payload: serde_json::from_str(&row.payload)?,
            parent_id: row
                .parent_id
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()
                .map_err(|e| CoreError::Database(format!("bad log parent id: {e}")))?,
        })
    }
}

#[async_trait]
impl LogRepository for SqliteLogRepository {
    async fn append(&self, entry: &LogEntry) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO processing_log
               (id, document_id, timestamp, step, event, payload, parent_id)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(entry.document_id)
        .bind(entry.timestamp.to_rfc3339())
        .bind(&entry.step)
        .bind(entry.event.as_str())
        .bind(serde_json::to_string(&entry.payload)?)
        .bind(entry.parent_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_document(&self, document_id: i64) -> CoreResult<Vec<LogEntry>> {
        // seq preserves emit order; timestamps may collide within a run.
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, document_id, timestamp, step, event, payload, parent_id
             FROM processing_log WHERE document_id = ? ORDER BY seq ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LogEntry::try_from).collect()
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM processing_log WHERE timestamp < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
