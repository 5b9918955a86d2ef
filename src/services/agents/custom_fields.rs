//! Custom-fields agent, the pipeline's finalizer.
//!
//! Fills configured custom fields from the document content and moves the
//! document to `processed`. This step never blocks the pipeline: a failed
//! or rejected analysis still finalizes the document, carrying
//! `needs_review` in its result. With no custom fields configured it acts
//! as a plain no-op finalizer.

use serde_json::json;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    AnnotationTarget, CustomFieldValue, CustomFieldsAnalysis, Document, DocumentPatch,
    PipelineStep, StepResult,
};
use crate::domain::ports::VectorRecord;

use super::super::confirmation_loop::{ConfirmationEngine, LoopConfig};
use super::super::templates::render;
use super::super::tools::ToolRegistry;
use super::{candidate_lines, excerpt, AgentDeps};

const SYSTEM_ANALYSIS: &str = "\
You extract custom-field values from scanned documents. Only propose \
values literally present in the content. Answer in the requested JSON \
shape.";

const SYSTEM_CONFIRM: &str = "\
You verify extracted field values against the document. Reject any value \
not supported by the content. Answer in the requested JSON shape.";

pub struct CustomFieldsAgent<'a> {
    deps: &'a AgentDeps,
}

impl<'a> CustomFieldsAgent<'a> {
    pub fn new(deps: &'a AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, document: &Document) -> CoreResult<StepResult> {
        let deps = self.deps;
        let step = PipelineStep::CustomFields;

        let tag_names = deps.document_tag_names(document).await?;
        let from_tag = deps.current_state_tag(&tag_names);
        let to_tag = deps.settings.workflow.processed.clone();

        let fields = deps.dms.list_custom_fields().await?;
        let excluded = deps.excluded_ids(AnnotationTarget::CustomField).await?;
        let fields: Vec<_> = fields.into_iter().filter(|f| !excluded.contains(&f.id)).collect();

        if fields.is_empty() {
            self.finalize(document, &from_tag, &to_tag).await?;
            return Ok(StepResult::skipped(step));
        }

        let content_excerpt = excerpt(&document.content, 1500);
        let descriptions = deps.annotation_lines(AnnotationTarget::CustomField).await?;
        let template = deps.templates.analysis(step, &deps.settings.prompt_language).await?;
        let mut field_block = candidate_lines(
            fields.iter().map(|f| format!("{} (id {}, {})", f.name, f.id, f.data_type)),
        );
        if descriptions != "(none)" {
            field_block.push_str(&format!("\n\nField descriptions:\n{descriptions}"));
        }
        let analysis_prompt = render(
            &template,
            &[
                ("custom_fields", field_block.as_str()),
                ("document_content", excerpt(&document.content, 6000).as_str()),
            ],
        );

        let confirm_template = deps.templates.confirm(step, &deps.settings.prompt_language).await?;
        let confirm_excerpt = content_excerpt.clone();
        let config = LoopConfig {
            step,
            schema: CustomFieldsAnalysis::schema(),
            system_analysis: SYSTEM_ANALYSIS.to_string(),
            system_confirm: SYSTEM_CONFIRM.to_string(),
            analysis_prompt,
            confirm_prompt: Box::new(move |analysis| {
                let fields = analysis.get("fields").cloned().unwrap_or(json!([]));
                let reasoning = analysis
                    .get("reasoning")
                    .and_then(|r| r.as_str())
                    .unwrap_or_default()
                    .to_string();
                render(
                    &confirm_template,
                    &[
                        ("document_excerpt", confirm_excerpt.as_str()),
                        ("suggested_fields", fields.to_string().as_str()),
                        ("reasoning", reasoning.as_str()),
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

        if outcome.confirmed {
            let analysis: CustomFieldsAnalysis =
                serde_json::from_value(outcome.analysis.clone().unwrap_or(json!({})))?;

            // Merge with existing values; unknown field ids are dropped.
            let mut values = document.custom_fields.clone();
            for suggested in &analysis.fields {
                if !fields.iter().any(|f| f.id == suggested.field_id) {
                    continue;
                }
                match values.iter_mut().find(|v| v.field == suggested.field_id) {
                    Some(existing) => existing.value = suggested.value.clone(),
                    None => values.push(CustomFieldValue {
                        field: suggested.field_id,
                        value: suggested.value.clone(),
                    }),
                }
            }
            if values != document.custom_fields {
                deps.dms
                    .update_document(
                        document.id,
                        &DocumentPatch { custom_fields: Some(values), ..Default::default() },
                    )
                    .await?;
            }
            self.finalize(document, &from_tag, &to_tag).await?;

            let mut result = StepResult::success(step).with_attempts(outcome.attempts);
            result.reasoning = Some(analysis.reasoning);
            result.value = Some(format!("{} field(s)", analysis.fields.len()));
            return Ok(result);
        }

        // Never blocks the pipeline: finalize anyway and flag for review.
        self.finalize(document, &from_tag, &to_tag).await?;
        let mut result = StepResult::success(step).with_attempts(outcome.attempts);
        result.needs_review = true;
        result.error = outcome.error;
        Ok(result)
    }

    /// Transition to `processed` and index the finished document for
    /// similarity search, best effort.
    async fn finalize(&self, document: &Document, from: &str, to: &str) -> CoreResult<()> {
        let deps = self.deps;
        deps.dms.transition_tag(document.id, from, to).await?;

        let fresh = deps.dms.get_document(document.id).await?;
        let tag_map = deps.tag_name_map().await?;
        let workflow = &deps.settings.workflow;
        let correspondent = match fresh.correspondent {
            Some(id) => deps
                .dms
                .list_correspondents()
                .await?
                .into_iter()
                .find(|c| c.id == id)
                .map(|c| c.name),
            None => None,
        };
        let document_type = match fresh.document_type {
            Some(id) => deps
                .dms
                .list_document_types()
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .map(|t| t.name),
            None => None,
        };
        let record = VectorRecord {
            document_id: fresh.id,
            title: fresh.title.clone(),
            content: fresh.content.clone(),
            tags: fresh
                .tags
                .iter()
                .filter_map(|id| tag_map.get(id).cloned())
                .filter(|name| !workflow.is_workflow_tag(name))
                .collect(),
            correspondent,
            document_type,
        };
        if let Err(error) = deps.vector.upsert(&record).await {
            tracing::debug!(%error, document_id = fresh.id, "vector upsert skipped");
        }
        Ok(())
    }
}
