//! Tags agent.
//!
//! Applies existing-tag proposals immediately, queues every new-tag
//! proposal for review, and removes clearly wrong content tags. Workflow
//! tags are untouchable in both directions, and a proposal that collides
//! with a document-type name is dropped even if the model ignored the
//! prompt-side rule.

use serde_json::json;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    AnnotationTarget, Document, DocumentPatch, PendingReview, PipelineStep, ReviewKind,
    StepResult, SuggestedTag, TagsAnalysis,
};

use super::super::confirmation_loop::{ConfirmationEngine, LoopConfig};
use super::super::templates::render;
use super::super::tools::ToolRegistry;
use super::{candidate_lines, excerpt, AgentDeps};

const SYSTEM_ANALYSIS: &str = "\
You assign content tags to scanned documents. Reuse existing tags wherever \
they fit; mark genuinely new topics as new. Never propose workflow tags or \
names that duplicate a document type. Answer in the requested JSON shape.";

const SYSTEM_CONFIRM: &str = "\
You review tag proposals for scanned documents. Reject proposals not \
supported by the content. Answer in the requested JSON shape.";

pub struct TagsAgent<'a> {
    deps: &'a AgentDeps,
}

impl<'a> TagsAgent<'a> {
    pub fn new(deps: &'a AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, document: &Document) -> CoreResult<StepResult> {
        let deps = self.deps;
        let step = PipelineStep::Tags;
        let workflow = &deps.settings.workflow;
        let content_excerpt = excerpt(&document.content, 1500);

        let all_tags = deps.dms.list_tags().await?;
        let excluded = deps.excluded_ids(AnnotationTarget::Tag).await?;
        let candidates: Vec<_> = all_tags
            .iter()
            .filter(|t| !workflow.is_workflow_tag(&t.name) && !excluded.contains(&t.id))
            .collect();
        let current_tag_names: Vec<String> = all_tags
            .iter()
            .filter(|t| document.tags.contains(&t.id))
            .map(|t| t.name.clone())
            .collect();
        let types = deps.dms.list_document_types().await?;
        let type_names: Vec<String> = types.iter().map(|t| t.name.clone()).collect();
        let current_type_name = document
            .document_type
            .and_then(|id| types.iter().find(|t| t.id == id))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "-".to_string());
        let blocked = deps.blocked_names(ReviewKind::Tag).await?;
        let descriptions = deps.annotation_lines(AnnotationTarget::Tag).await?;

        let template = deps.templates.analysis(step, &deps.settings.prompt_language).await?;
        let existing_block = candidate_lines(
            candidates.iter().map(|t| format!("{} (id {})", t.name, t.id)),
        );
        let similar_docs = deps.similar_docs_block(&content_excerpt, 5).await;
        let mut analysis_prompt = render(
            &template,
            &[
                ("existing_tags", existing_block.as_str()),
                (
                    "current_tags",
                    candidate_lines(
                        current_tag_names
                            .iter()
                            .filter(|n| !workflow.is_workflow_tag(n))
                            .cloned(),
                    )
                    .as_str(),
                ),
                ("document_type", current_type_name.as_str()),
                ("similar_docs", similar_docs.as_str()),
                ("document_content", excerpt(&document.content, 6000).as_str()),
            ],
        );
        if descriptions != "(none)" {
            analysis_prompt.push_str(&format!("\n\n## Tag descriptions\n{descriptions}"));
        }
        if !blocked.is_empty() {
            analysis_prompt.push_str(&format!(
                "\n\n## Never propose these names\n{}",
                candidate_lines(blocked)
            ));
        }

        let confirm_template = deps.templates.confirm(step, &deps.settings.prompt_language).await?;
        let confirm_excerpt = content_excerpt.clone();
        let config = LoopConfig {
            step,
            schema: TagsAnalysis::schema(),
            system_analysis: SYSTEM_ANALYSIS.to_string(),
            system_confirm: SYSTEM_CONFIRM.to_string(),
            analysis_prompt,
            confirm_prompt: Box::new(move |analysis| {
                render(
                    &confirm_template,
                    &[
                        ("document_excerpt", confirm_excerpt.as_str()),
                        ("analysis_result", analysis.to_string().as_str()),
                    ],
                )
            }),
            max_retries: deps.settings.max_retries,
            tool_budget: deps.settings.tool_budget,
            tools_enabled: true,
        };

        let tools = ToolRegistry::new(deps.dms.clone(), deps.vector.clone(), workflow.clone());
        let engine = ConfirmationEngine {
            large: deps.large.as_ref(),
            small: deps.small.as_ref(),
            tools: Some(&tools),
            logger: &deps.logger,
        };
        let outcome = engine.run(document.id, &config).await;

        let tag_names = deps.document_tag_names(document).await?;
        let from_tag = deps.current_state_tag(&tag_names);
        let to_tag = workflow.tags_done.clone();

        if !outcome.confirmed {
            deps.queue_failure_review(document, ReviewKind::Tag, String::new(), &outcome, &to_tag)
                .await?;
            let mut result = StepResult::failure(
                step,
                outcome.error.clone().unwrap_or_else(|| "tags not confirmed".to_string()),
            )
            .with_attempts(outcome.attempts);
            result.needs_review = true;
            return Ok(result);
        }

        let analysis: TagsAnalysis =
            serde_json::from_value(outcome.analysis.clone().unwrap_or(json!({})))?;

        // Enforce the naming rules again at apply time; the prompt-side
        // rule is advisory only.
        let mut apply_existing: Vec<&SuggestedTag> = Vec::new();
        let mut queue_new: Vec<&SuggestedTag> = Vec::new();
        for proposal in &analysis.suggested_tags {
            let name = proposal.name.trim();
            if name.is_empty()
                || workflow.is_reserved_name(name)
                || type_names.iter().any(|t| t.eq_ignore_ascii_case(name))
                || deps.blocklist.is_blocked(name, ReviewKind::Tag).await?
            {
                continue;
            }
            let existing = proposal
                .existing_tag_id
                .filter(|id| candidates.iter().any(|t| t.id == *id))
                .is_some()
                || candidates.iter().any(|t| t.name.eq_ignore_ascii_case(name));
            if existing && !proposal.is_new {
                apply_existing.push(proposal);
            } else if existing {
                // Claimed new but an existing tag matches: reuse it.
                apply_existing.push(proposal);
            } else {
                queue_new.push(proposal);
            }
        }

        // Compute the new tag set in one write: removals first, additions
        // after. Workflow tags never leave the set here.
        let mut new_tag_ids = document.tags.clone();
        for removal in &analysis.tags_to_remove {
            if workflow.is_workflow_tag(&removal.tag_name) {
                continue;
            }
            if let Some(tag) = all_tags.iter().find(|t| t.name.eq_ignore_ascii_case(&removal.tag_name))
            {
                new_tag_ids.retain(|id| *id != tag.id);
            }
        }
        for proposal in &apply_existing {
            let tag = proposal
                .existing_tag_id
                .and_then(|id| candidates.iter().find(|t| t.id == id))
                .or_else(|| {
                    candidates.iter().find(|t| t.name.eq_ignore_ascii_case(proposal.name.trim()))
                });
            if let Some(tag) = tag {
                if !new_tag_ids.contains(&tag.id) {
                    new_tag_ids.push(tag.id);
                }
            }
        }
        if new_tag_ids != document.tags {
            deps.dms
                .update_document(document.id, &DocumentPatch::tags(new_tag_ids))
                .await?;
        }

        // Every new-tag proposal is review-gated, success or not. One
        // active review per (document, kind): the first proposal leads,
        // the rest ride along as alternatives.
        deps.reviews.remove_active(document.id, ReviewKind::Tag).await?;
        if let Some(first) = queue_new.first() {
            let mut review =
                PendingReview::new(document.id, ReviewKind::Tag, first.name.trim())
                    .with_title(document.title.clone())
                    .with_reasoning(analysis.reasoning.clone());
            review.alternatives =
                queue_new.iter().skip(1).map(|p| p.name.trim().to_string()).collect();
            review.attempts = outcome.attempts;
            review.metadata = json!({
                "proposed_tags": queue_new
                    .iter()
                    .map(|p| json!({ "name": p.name.trim(), "relevance": p.relevance }))
                    .collect::<Vec<_>>(),
            });
            deps.reviews.upsert(&review).await?;
        }

        deps.dms.transition_tag(document.id, &from_tag, &to_tag).await?;
        deps.dms.remove_tag(document.id, &workflow.manual_review).await?;

        let mut result = StepResult::success(step).with_attempts(outcome.attempts);
        result.value = Some(
            apply_existing
                .iter()
                .map(|p| p.name.trim().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        );
        result.reasoning = Some(analysis.reasoning);
        result.confidence = Some(analysis.confidence);
        result.alternatives = queue_new.iter().map(|p| p.name.trim().to_string()).collect();
        result.needs_review = !queue_new.is_empty();
        Ok(result)
    }
}
