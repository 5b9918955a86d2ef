//! Review queue operations.
//!
//! Approval applies a queued proposal against the DMS and is idempotent:
//! entities are get-or-created, tag additions no-op when present, and an
//! already-resolved review id is a gentle no-op. Rejection can block the
//! suggestion from ever being proposed again.

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{
    BlockScope, BlockedSuggestion, EntityKind, PendingReview, PipelineState, ReviewKind,
    Settings,
};
use crate::domain::ports::{BlocklistRepository, DocumentStore, ReviewRepository};

/// What `approve` did.
#[derive(Debug, Clone)]
pub struct ApproveOutcome {
    pub applied: bool,
    pub message: Option<String>,
}

/// Options for `reject_with_feedback`.
#[derive(Debug, Clone)]
pub struct RejectionFeedback {
    /// Add a blocked-suggestion record for the rejected name.
    pub block: bool,
    pub scope: BlockScope,
    pub reason: Option<String>,
    pub category: Option<String>,
}

pub struct ReviewService {
    dms: Arc<dyn DocumentStore>,
    reviews: Arc<dyn ReviewRepository>,
    blocklist: Arc<dyn BlocklistRepository>,
    settings: Settings,
}

impl ReviewService {
    pub fn new(
        dms: Arc<dyn DocumentStore>,
        reviews: Arc<dyn ReviewRepository>,
        blocklist: Arc<dyn BlocklistRepository>,
        settings: Settings,
    ) -> Self {
        Self { dms, reviews, blocklist, settings }
    }

    pub async fn list(&self, kind: Option<ReviewKind>) -> CoreResult<Vec<PendingReview>> {
        self.reviews.list(kind).await
    }

    pub async fn counts(&self) -> CoreResult<HashMap<ReviewKind, usize>> {
        self.reviews.counts().await
    }

    /// Apply a proposal. `selected_value` picks one of the alternatives
    /// instead of the primary suggestion.
    pub async fn approve(
        &self,
        id: Uuid,
        selected_value: Option<&str>,
    ) -> CoreResult<ApproveOutcome> {
        let Some(review) = self.reviews.get(id).await? else {
            return Ok(ApproveOutcome {
                applied: false,
                message: Some("review already resolved".to_string()),
            });
        };
        let value = selected_value.unwrap_or(&review.suggestion).trim().to_string();

        let outcome = match review.kind {
            ReviewKind::Correspondent => {
                let entity = self.dms.get_or_create_correspondent(&value).await?;
                self.dms
                    .update_document(
                        review.document_id,
                        &crate::domain::models::DocumentPatch {
                            correspondent: Some(Some(entity.id)),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.advance(&review).await?;
                ApproveOutcome { applied: true, message: None }
            }
            ReviewKind::DocumentType => {
                let entity = self.dms.get_or_create_document_type(&value).await?;
                self.dms
                    .update_document(
                        review.document_id,
                        &crate::domain::models::DocumentPatch {
                            document_type: Some(Some(entity.id)),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.advance(&review).await?;
                ApproveOutcome { applied: true, message: None }
            }
            ReviewKind::Tag => {
                self.dms.add_tag(review.document_id, &value).await?;
                self.advance(&review).await?;
                ApproveOutcome { applied: true, message: None }
            }
            ReviewKind::Title => {
                self.dms
                    .update_document(
                        review.document_id,
                        &crate::domain::models::DocumentPatch::title(&value),
                    )
                    .await?;
                self.advance(&review).await?;
                ApproveOutcome { applied: true, message: None }
            }
            ReviewKind::SchemaMerge => {
                let (kind, source_id, target_id) = merge_metadata(&review)?;
                let moved = self.dms.merge_entities(kind, source_id, target_id).await?;
                ApproveOutcome {
                    applied: true,
                    message: Some(format!("reassigned {moved} document(s)")),
                }
            }
            ReviewKind::SchemaDelete => {
                let (kind, entity_id) = delete_metadata(&review)?;
                if self.entity_in_use(kind, entity_id).await? {
                    // Soft failure: the entity gained documents since the
                    // analysis ran. Keep the review so the user sees it.
                    return Ok(ApproveOutcome {
                        applied: false,
                        message: Some(format!(
                            "{kind} {entity_id} is no longer unused; delete skipped"
                        )),
                    });
                }
                self.dms.delete_entity(kind, entity_id).await?;
                ApproveOutcome { applied: true, message: None }
            }
        };

        self.reviews.remove(id).await?;
        Ok(outcome)
    }

    /// Remove the review without blocking anything.
    pub async fn reject(&self, id: Uuid) -> CoreResult<()> {
        self.reviews.remove(id).await
    }

    /// Remove the review; optionally record the suggestion as blocked so
    /// agents stop proposing it.
    pub async fn reject_with_feedback(
        &self,
        id: Uuid,
        feedback: RejectionFeedback,
    ) -> CoreResult<()> {
        let Some(review) = self.reviews.get(id).await? else {
            return Ok(());
        };
        if feedback.block && !review.suggestion.trim().is_empty() {
            let mut block = BlockedSuggestion::new(review.suggestion.clone(), feedback.scope);
            if feedback.scope == BlockScope::Kind {
                block.kind = Some(review.kind);
            }
            block.reason = feedback.reason;
            block.category = feedback.category;
            block.document_id =
                (review.document_id != 0).then_some(review.document_id);
            self.blocklist.insert(&block).await?;
        }
        self.reviews.remove(id).await
    }

    /// Collapse several pending proposals into one record under a chosen
    /// canonical name. Used by the clean-up-pending surface.
    pub async fn merge(&self, ids: &[Uuid], final_name: &str) -> CoreResult<PendingReview> {
        let mut reviews = Vec::new();
        for id in ids {
            if let Some(review) = self.reviews.get(*id).await? {
                reviews.push(review);
            }
        }
        let Some(first) = reviews.first().cloned() else {
            return Err(CoreError::NotFound("no pending reviews to merge".to_string()));
        };

        let document_ids: Vec<i64> = reviews
            .iter()
            .map(|r| r.document_id)
            .filter(|id| *id != 0)
            .collect();
        for review in &reviews {
            self.reviews.remove(review.id).await?;
        }

        let mut merged = PendingReview::new(first.document_id, first.kind, final_name)
            .with_title(first.document_title.clone());
        merged.reasoning = format!(
            "merged from {} pending suggestion(s): {}",
            reviews.len(),
            reviews.iter().map(|r| r.suggestion.as_str()).collect::<Vec<_>>().join(", ")
        );
        merged.next_tag = first.next_tag.clone();
        merged.metadata = json!({ "document_ids": document_ids });
        self.reviews.upsert(&merged).await?;
        Ok(merged)
    }

    /// Transition the document to the review's `next_tag` and lift the
    /// manual-review flag so the scheduler picks it up again.
    async fn advance(&self, review: &PendingReview) -> CoreResult<()> {
        if review.document_id == 0 {
            return Ok(());
        }
        if let Some(next_tag) = &review.next_tag {
            let document = self.dms.get_document(review.document_id).await?;
            let tag_map: HashMap<i64, String> = self
                .dms
                .list_tags()
                .await?
                .into_iter()
                .map(|t| (t.id, t.name))
                .collect();
            let names: Vec<String> = document
                .tags
                .iter()
                .filter_map(|id| tag_map.get(id).cloned())
                .collect();
            let state = PipelineState::from_tag_names(&names, &self.settings.workflow);
            let from = self.settings.workflow.tag_for_state(state);
            self.dms.transition_tag(review.document_id, from, next_tag).await?;
        }
        self.dms
            .remove_tag(review.document_id, &self.settings.workflow.manual_review)
            .await?;
        Ok(())
    }

    async fn entity_in_use(&self, kind: EntityKind, id: i64) -> CoreResult<bool> {
        let entities = match kind {
            EntityKind::Correspondent => self.dms.list_correspondents().await?,
            EntityKind::DocumentType => self.dms.list_document_types().await?,
            EntityKind::Tag => {
                return Ok(true);
            }
        };
        Ok(entities.iter().any(|e| e.id == id && e.document_count > 0))
    }
}

fn merge_metadata(review: &PendingReview) -> CoreResult<(EntityKind, i64, i64)> {
    let kind = entity_kind(&review.metadata)?;
    let source = review
        .metadata
        .get("source_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| CoreError::Job("schema_merge review missing source_id".to_string()))?;
    let target = review
        .metadata
        .get("target_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| CoreError::Job("schema_merge review missing target_id".to_string()))?;
    Ok((kind, source, target))
}

fn delete_metadata(review: &PendingReview) -> CoreResult<(EntityKind, i64)> {
    let kind = entity_kind(&review.metadata)?;
    let id = review
        .metadata
        .get("entity_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| CoreError::Job("schema_delete review missing entity_id".to_string()))?;
    Ok((kind, id))
}

fn entity_kind(metadata: &serde_json::Value) -> CoreResult<EntityKind> {
    metadata
        .get("entity_kind")
        .and_then(|v| v.as_str())
        .and_then(|s| match s {
            "tag" => Some(EntityKind::Tag),
            "correspondent" => Some(EntityKind::Correspondent),
            "document_type" => Some(EntityKind::DocumentType),
            _ => None,
        })
        .ok_or_else(|| CoreError::Job("schema review missing entity_kind".to_string()))
}
