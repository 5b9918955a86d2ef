//! Shared flow of the correspondent and document-type agents.
//!
//! Both steps assign a named entity to the document: prefer an existing
//! one, queue genuinely new names for review, never auto-create.

use serde_json::json;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    Document, DocumentPatch, EntityAnalysis, NamedEntity, PendingReview, PipelineStep,
    ReviewKind, StepResult,
};

use super::super::confirmation_loop::{ConfirmationEngine, LoopConfig};
use super::super::templates::render;
use super::super::tools::ToolRegistry;
use super::{candidate_lines, excerpt, AgentDeps};

pub(super) struct EntityStep {
    pub step: PipelineStep,
    pub kind: ReviewKind,
    pub system_analysis: &'static str,
    pub system_confirm: &'static str,
    /// Placeholder carrying the candidate list in the analysis template.
    pub candidates_placeholder: &'static str,
}

impl EntityStep {
    pub(super) async fn run(
        &self,
        deps: &AgentDeps,
        document: &Document,
        candidates: Vec<NamedEntity>,
    ) -> CoreResult<StepResult> {
        let content_excerpt = excerpt(&document.content, 1500);
        let blocked = deps.blocked_names(self.kind).await?;

        let template = deps
            .templates
            .analysis(self.step, &deps.settings.prompt_language)
            .await?;
        let candidate_block = candidate_lines(
            candidates.iter().map(|c| format!("{} (id {})", c.name, c.id)),
        );
        let similar_docs = deps.similar_docs_block(&content_excerpt, 5).await;
        let mut analysis_prompt = render(
            &template,
            &[
                (self.candidates_placeholder, candidate_block.as_str()),
                ("similar_docs", similar_docs.as_str()),
                ("document_content", excerpt(&document.content, 6000).as_str()),
            ],
        );
        if !blocked.is_empty() {
            analysis_prompt.push_str(&format!(
                "\n\n## Never propose these names\n{}",
                candidate_lines(blocked)
            ));
        }

        let confirm_template = deps
            .templates
            .confirm(self.step, &deps.settings.prompt_language)
            .await?;
        let confirm_excerpt = content_excerpt.clone();
        let config = LoopConfig {
            step: self.step,
            schema: EntityAnalysis::schema(),
            system_analysis: self.system_analysis.to_string(),
            system_confirm: self.system_confirm.to_string(),
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

        let tools = ToolRegistry::new(
            deps.dms.clone(),
            deps.vector.clone(),
            deps.settings.workflow.clone(),
        );
        let engine = ConfirmationEngine {
            large: deps.large.as_ref(),
            small: deps.small.as_ref(),
            tools: Some(&tools),
            logger: &deps.logger,
        };
        let outcome = engine.run(document.id, &config).await;

        let tag_names = deps.document_tag_names(document).await?;
        let from_tag = deps.current_state_tag(&tag_names);
        let to_tag = self.step.output_tag(&deps.settings.workflow).to_string();

        if !outcome.confirmed {
            let suggestion = outcome
                .analysis
                .as_ref()
                .and_then(|a| a.get("suggested_name"))
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string();
            deps.queue_failure_review(document, self.kind, suggestion, &outcome, &to_tag)
                .await?;
            let mut result = StepResult::failure(
                self.step,
                outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("{} not confirmed", self.kind)),
            )
            .with_attempts(outcome.attempts);
            result.needs_review = true;
            return Ok(result);
        }

        let analysis: EntityAnalysis =
            serde_json::from_value(outcome.analysis.clone().unwrap_or(json!({})))?;
        let name = analysis.suggested_name.trim().to_string();

        // A blocked name never gets applied or queued; the step still
        // completes so the document does not wedge here.
        if name.is_empty() || deps.blocklist.is_blocked(&name, self.kind).await? {
            deps.dms.transition_tag(document.id, &from_tag, &to_tag).await?;
            let mut result = StepResult::success(self.step).with_attempts(outcome.attempts);
            result.reasoning = Some(analysis.reasoning);
            return Ok(result);
        }

        // Resolve against existing entities: by id when the model picked
        // one, otherwise by case-insensitive name.
        let resolved = analysis
            .existing_id
            .and_then(|id| candidates.iter().find(|c| c.id == id))
            .or_else(|| candidates.iter().find(|c| c.name.eq_ignore_ascii_case(&name)));

        // An existing match always wins, even when the model claimed the
        // name was new.
        match resolved {
            Some(entity) => {
                let patch = self.assignment_patch(entity.id);
                deps.dms.update_document(document.id, &patch).await?;
                deps.dms.transition_tag(document.id, &from_tag, &to_tag).await?;
                deps.reviews.remove_active(document.id, self.kind).await?;

                let mut result = StepResult::success(self.step)
                    .with_value(entity.name.clone())
                    .with_attempts(outcome.attempts);
                result.reasoning = Some(analysis.reasoning);
                result.confidence = Some(analysis.confidence);
                result.alternatives = analysis.alternatives;
                Ok(result)
            }
            _ => {
                // New entity: queued for review, never auto-created.
                let mut review = PendingReview::new(document.id, self.kind, name.clone())
                    .with_title(document.title.clone())
                    .with_reasoning(analysis.reasoning.clone())
                    .with_next_tag(&to_tag);
                review.alternatives = analysis.alternatives.clone();
                review.attempts = outcome.attempts;
                review.metadata = json!({ "confidence": analysis.confidence });
                deps.reviews.upsert(&review).await?;
                deps.dms
                    .add_tag(document.id, &deps.settings.workflow.manual_review)
                    .await?;

                let mut result = StepResult::success(self.step)
                    .with_value(name)
                    .with_attempts(outcome.attempts);
                result.needs_review = true;
                result.reasoning = Some(analysis.reasoning);
                result.confidence = Some(analysis.confidence);
                result.alternatives = analysis.alternatives;
                Ok(result)
            }
        }
    }

    fn assignment_patch(&self, entity_id: i64) -> DocumentPatch {
        match self.step {
            PipelineStep::Correspondent => DocumentPatch {
                correspondent: Some(Some(entity_id)),
                ..Default::default()
            },
            _ => DocumentPatch {
                document_type: Some(Some(entity_id)),
                ..Default::default()
            },
        }
    }
}
