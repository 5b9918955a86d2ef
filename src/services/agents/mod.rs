//! Step agents.
//!
//! One agent per pipeline step. All of them follow the same contract:
//! collect context from live DMS state, build prompts from the configured
//! templates, run the confirmation loop, apply the confirmed result, and
//! transition the document's workflow tag. Failures queue a pending review
//! instead of transitioning.

pub mod correspondent;
pub mod custom_fields;
pub mod document_type;
mod entity;
pub mod ocr;
pub mod summary;
pub mod tags;
pub mod title;

pub use correspondent::CorrespondentAgent;
pub use custom_fields::CustomFieldsAgent;
pub use document_type::DocumentTypeAgent;
pub use ocr::OcrAgent;
pub use summary::SummaryAgent;
pub use tags::TagsAgent;
pub use title::TitleAgent;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    AnnotationTarget, Document, PendingReview, PipelineState, ReviewKind, Settings,
};
use crate::domain::ports::{
    AnnotationRepository, BlocklistRepository, DocumentStore, LanguageModel, ReviewRepository,
    VectorSearch, VisionModel,
};

use super::confirmation_loop::LoopOutcome;
use super::logger::LoggerHandle;
use super::templates::TemplateStore;

/// Collaborators shared by every agent. Settings are a per-call snapshot
/// taken by the orchestrator; agents never re-read them mid-step.
#[derive(Clone)]
pub struct AgentDeps {
    pub dms: Arc<dyn DocumentStore>,
    pub large: Arc<dyn LanguageModel>,
    pub small: Arc<dyn LanguageModel>,
    pub vision: Arc<dyn VisionModel>,
    pub vector: Arc<dyn VectorSearch>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub blocklist: Arc<dyn BlocklistRepository>,
    pub annotations: Arc<dyn AnnotationRepository>,
    pub templates: TemplateStore,
    pub logger: LoggerHandle,
    pub settings: Settings,
}

impl AgentDeps {
    /// Workflow tag currently encoding the document's state; used as the
    /// `from` side of the step's transition.
    pub fn current_state_tag(&self, tag_names: &[String]) -> String {
        let state = PipelineState::from_tag_names(tag_names, &self.settings.workflow);
        self.settings.workflow.tag_for_state(state).to_string()
    }

    /// Resolve a document's tag ids to names.
    pub async fn document_tag_names(&self, document: &Document) -> CoreResult<Vec<String>> {
        let map = self.tag_name_map().await?;
        Ok(document
            .tags
            .iter()
            .filter_map(|id| map.get(id).cloned())
            .collect())
    }

    pub async fn tag_name_map(&self) -> CoreResult<HashMap<i64, String>> {
        Ok(self
            .dms
            .list_tags()
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect())
    }

    /// Titles of similar processed documents, best effort: vector-store
    /// failures degrade to an empty context block.
    pub async fn similar_titles(&self, query: &str, limit: usize) -> Vec<String> {
        match self.vector.search(query, limit).await {
            Ok(hits) => hits.into_iter().map(|h| h.title).collect(),
            Err(error) => {
                tracing::debug!(%error, "similar-document search unavailable");
                Vec::new()
            }
        }
    }

    /// Rendered similar-document block with attribute patterns.
    pub async fn similar_docs_block(&self, query: &str, limit: usize) -> String {
        match self.vector.search(query, limit).await {
            Ok(hits) if !hits.is_empty() => hits
                .into_iter()
                .map(|h| {
                    format!(
                        "- \"{}\" correspondent={} type={} tags=[{}]",
                        h.title,
                        h.correspondent.as_deref().unwrap_or("-"),
                        h.document_type.as_deref().unwrap_or("-"),
                        h.tags.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => "(none)".to_string(),
        }
    }

    /// Names the user blocked for this kind, for prompt context.
    pub async fn blocked_names(&self, kind: ReviewKind) -> CoreResult<Vec<String>> {
        let blocks = self.blocklist.list().await?;
        Ok(blocks
            .into_iter()
            .filter(|b| match b.scope {
                crate::domain::models::BlockScope::Global => true,
                crate::domain::models::BlockScope::Kind => b.kind == Some(kind),
            })
            .map(|b| b.name)
            .collect())
    }

    /// Tag/custom-field descriptions for prompts. Entries flagged as
    /// excluded are dropped from candidate lists by the callers.
    pub async fn annotation_lines(&self, target: AnnotationTarget) -> CoreResult<String> {
        let annotations = self.annotations.list(target).await?;
        let lines: Vec<String> = annotations
            .iter()
            .filter(|a| !a.excluded && !a.description.is_empty())
            .map(|a| format!("- {}: {}", a.name, a.description))
            .collect();
        Ok(if lines.is_empty() { "(none)".to_string() } else { lines.join("\n") })
    }

    /// Ids of entities the user excluded from AI analysis.
    pub async fn excluded_ids(&self, target: AnnotationTarget) -> CoreResult<Vec<i64>> {
        let annotations = self.annotations.list(target).await?;
        Ok(annotations.iter().filter(|a| a.excluded).map(|a| a.target_id).collect())
    }

    /// Queue a pending review for a failed confirmation loop and flag the
    /// document for manual review. The workflow tag is left untouched so
    /// the step can be re-run after the review is resolved.
    pub async fn queue_failure_review(
        &self,
        document: &Document,
        kind: ReviewKind,
        suggestion: String,
        outcome: &LoopOutcome,
        next_tag: &str,
    ) -> CoreResult<()> {
        let mut review = PendingReview::new(document.id, kind, suggestion)
            .with_title(document.title.clone())
            .with_next_tag(next_tag);
        review.attempts = outcome.attempts;
        review.last_feedback = outcome.last_feedback.clone();
        if let Some(analysis) = &outcome.analysis {
            review.reasoning = analysis
                .get("reasoning")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string();
            review.metadata = analysis.clone();
        }
        if let Some(error) = &outcome.error {
            if review.last_feedback.is_none() {
                review.last_feedback = Some(error.clone());
            }
        }
        self.reviews.upsert(&review).await?;
        self.dms
            .add_tag(document.id, &self.settings.workflow.manual_review)
            .await?;
        Ok(())
    }
}

/// First `max_chars` of the content on a char boundary, for confirmation
/// prompts and log payloads.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    content.chars().take(max_chars).collect::<String>() + "…"
}

/// Render a candidate list as prompt lines, `(none)` when empty.
pub fn candidate_lines<I: IntoIterator<Item = String>>(names: I) -> String {
    let lines: Vec<String> = names.into_iter().map(|n| format!("- {n}")).collect();
    if lines.is_empty() { "(none)".to_string() } else { lines.join("\n") }
}
