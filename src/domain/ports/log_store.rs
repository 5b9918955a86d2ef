//! Port for the processing-log store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::CoreResult;
use crate::domain::models::LogEntry;

#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> CoreResult<()>;

    /// All entries for a document in emit order.
    async fn list_for_document(&self, document_id: i64) -> CoreResult<Vec<LogEntry>>;

    /// Delete entries older than the cutoff; returns rows removed.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64>;
}
