//! Ports for the review queue and the suggestion blocklist.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::CoreResult;
use crate::domain::models::{BlockedSuggestion, PendingReview, ReviewKind};

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review, superseding any active one for the same
    /// `(document_id, kind)`.
    async fn upsert(&self, review: &PendingReview) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Option<PendingReview>>;

    /// Active review for a document and kind, if any.
    async fn get_active(
        &self,
        document_id: i64,
        kind: ReviewKind,
    ) -> CoreResult<Option<PendingReview>>;

    /// All active reviews, optionally filtered by kind, newest first.
    async fn list(&self, kind: Option<ReviewKind>) -> CoreResult<Vec<PendingReview>>;

    /// Active review counts per kind.
    async fn counts(&self) -> CoreResult<HashMap<ReviewKind, usize>>;

    async fn remove(&self, id: Uuid) -> CoreResult<()>;

    /// Remove the active review for `(document_id, kind)` if present.
    async fn remove_active(&self, document_id: i64, kind: ReviewKind) -> CoreResult<()>;
}

#[async_trait]
pub trait BlocklistRepository: Send + Sync {
    async fn insert(&self, block: &BlockedSuggestion) -> CoreResult<()>;

    async fn list(&self) -> CoreResult<Vec<BlockedSuggestion>>;

    async fn remove(&self, id: Uuid) -> CoreResult<()>;

    /// Whether `name` is suppressed for proposals of `kind`.
    async fn is_blocked(&self, name: &str, kind: ReviewKind) -> CoreResult<bool>;
}
