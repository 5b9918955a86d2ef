//! SQLite implementations of the review queue and blocklist stores.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{
    normalize_name, BlockScope, BlockedSuggestion, PendingReview, ReviewKind,
};
use crate::domain::ports::{BlocklistRepository, ReviewRepository};

#[derive(Clone)]
pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    document_id: i64,
    document_title: String,
    kind: String,
    suggestion: String,
    reasoning: String,
    alternatives: String,
    attempts: i64,
    last_feedback: Option<String>,
    next_tag: Option<String>,
    metadata: String,
    created_at: String,
}

impl TryFrom<ReviewRow> for PendingReview {
    type Error = CoreError;

    fn try_from(row: ReviewRow) -> CoreResult<Self> {
        Ok(PendingReview {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| CoreError::Database(format!("bad review id: {e}")))?,
            document_id: row.document_id,
            document_title: row.document_title,
            kind: ReviewKind::parse(&row.kind)
                .ok_or_else(|| CoreError::Database(format!("bad review kind '{}'", row.kind)))?,
            suggestion: row.suggestion,
            reasoning: row.reasoning,
            alternatives: serde_json::from_str(&row.alternatives)?,
            attempts: row.attempts as u32,
            last_feedback: row.last_feedback,
            next_tag: row.next_tag,
            metadata: serde_json::from_str(&row.metadata)?,
            created_at: chrono::DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| CoreError::Database(format!("bad review timestamp: {e}")))?
                .with_timezone(&chrono::Utc),
        })
    }
}

impl ReviewKind {
    fn is_document_scoped(&self) -> bool {
        !matches!(self, ReviewKind::SchemaMerge | ReviewKind::SchemaDelete)
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn upsert(&self, review: &PendingReview) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Supersede the prior active row. Document-scoped kinds are unique
        // per (document, kind); schema suggestions are unique per payload.
        if review.kind.is_document_scoped() {
            sqlx::query("DELETE FROM pending_reviews WHERE document_id = ? AND kind = ?")
                .bind(review.document_id)
                .bind(review.kind.as_str())
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query("DELETE FROM pending_reviews WHERE kind = ? AND metadata = ?")
                .bind(review.kind.as_str())
                .bind(serde_json::to_string(&review.metadata)?)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"INSERT INTO pending_reviews (id, document_id, document_title, kind, suggestion,
               reasoning, alternatives, attempts, last_feedback, next_tag, metadata, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(review.id.to_string())
        .bind(review.document_id)
        .bind(&review.document_title)
        .bind(review.kind.as_str())
        .bind(&review.suggestion)
        .bind(&review.reasoning)
        .bind(serde_json::to_string(&review.alternatives)?)
        .bind(review.attempts as i64)
        .bind(&review.last_feedback)
        .bind(&review.next_tag)
        .bind(serde_json::to_string(&review.metadata)?)
        .bind(review.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<PendingReview>> {
        let row: Option<ReviewRow> = sqlx::query_as("SELECT * FROM pending_reviews WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(PendingReview::try_from).transpose()
    }

    async fn get_active(
        &self,
        document_id: i64,
        kind: ReviewKind,
    ) -> CoreResult<Option<PendingReview>> {
        let row: Option<ReviewRow> = sqlx::query_as(
            "SELECT * FROM pending_reviews WHERE document_id = ? AND kind = ?
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(document_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PendingReview::try_from).transpose()
    }

    async fn list(&self, kind: Option<ReviewKind>) -> CoreResult<Vec<PendingReview>> {
        let rows: Vec<ReviewRow> = match kind {
            Some(kind) => {
                sqlx::query_as(
                    "SELECT * FROM pending_reviews WHERE kind = ? ORDER BY created_at DESC",
                )
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM pending_reviews ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(PendingReview::try_from).collect()
    }

    async fn counts(&self) -> CoreResult<HashMap<ReviewKind, usize>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, COUNT(*) FROM pending_reviews GROUP BY kind")
                .fetch_all(&self.pool)
                .await?;
        let mut counts = HashMap::new();
        for (kind, count) in rows {
            if let Some(kind) = ReviewKind::parse(&kind) {
                counts.insert(kind, count as usize);
            }
        }
        Ok(counts)
    }

    async fn remove(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM pending_reviews WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_active(&self, document_id: i64, kind: ReviewKind) -> CoreResult<()> {
        sqlx::query("DELETE FROM pending_reviews WHERE document_id = ? AND kind = ?")
            .bind(document_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteBlocklistRepository {
    pool: SqlitePool,
}

impl SqliteBlocklistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    id: String,
    name: String,
    normalized: String,
    scope: String,
    kind: Option<String>,
    reason: Option<String>,
    category: Option<String>,
    document_id: Option<i64>,
    created_at: String,
}

impl TryFrom<BlockRow> for BlockedSuggestion {
    type Error = CoreError;

    fn try_from(row: BlockRow) -> CoreResult<Self> {
        Ok(BlockedSuggestion {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| CoreError::Database(format!("bad block id: {e}")))?,
            name: row.name,
            normalized: row.normalized,
            scope: BlockScope::parse(&row.scope)
                .ok_or_else(|| CoreError::Database(format!("bad block scope '{}'", row.scope)))?,
            kind: row.kind.as_deref().and_then(ReviewKind::parse),
            reason: row.reason,
            category: row.category,
            document_id: row.document_id,
            created_at: chrono::DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| CoreError::Database(format!("bad block timestamp: {e}")))?
                .with_timezone(&chrono::Utc),
        })
    }
}

#[async_trait]
impl BlocklistRepository for SqliteBlocklistRepository {
    async fn insert(&self, block: &BlockedSuggestion) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO blocked_suggestions
               (id, name, normalized, scope, kind, reason, category, document_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(block.id.to_string())
        .bind(&block.name)
        .bind(&block.normalized)
        .bind(block.scope.as_str())
        .bind(block.kind.map(|k| k.as_str()))
        .bind(&block.reason)
        .bind(&block.category)
        .bind(block.document_id)
        .bind(block.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> CoreResult<Vec<BlockedSuggestion>> {
        let rows: Vec<BlockRow> =
            sqlx::query_as("SELECT * FROM blocked_suggestions ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(BlockedSuggestion::try_from).collect()
    }

    async fn remove(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM blocked_suggestions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_blocked(&self, name: &str, kind: ReviewKind) -> CoreResult<bool> {
        let normalized = normalize_name(name);
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM blocked_suggestions
             WHERE normalized = ? AND (scope = 'global' OR kind = ?)
             LIMIT 1",
        )
        .bind(&normalized)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
