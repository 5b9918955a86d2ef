//! Summary agent (optional step).
//!
//! Produces a short abstract and stores it in a custom field named
//! `summary` when the DMS has one; otherwise the abstract only lives in
//! the processing log. There is no review kind for summaries, so a failed
//! loop leaves the tag untouched for the next pass.

use serde_json::json;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    CustomFieldValue, Document, DocumentPatch, PipelineStep, StepResult, SummaryAnalysis,
};

use super::super::confirmation_loop::{ConfirmationEngine, LoopConfig};
use super::super::templates::render;
use super::{excerpt, AgentDeps};

const SYSTEM_ANALYSIS: &str = "\
You summarize scanned documents into short abstracts. Answer in the \
requested JSON shape.";

const SYSTEM_CONFIRM: &str = "\
You verify document summaries against the source. Answer in the requested \
JSON shape.";

pub struct SummaryAgent<'a> {
    deps: &'a AgentDeps,
}

impl<'a> SummaryAgent<'a> {
    pub fn new(deps: &'a AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, document: &Document) -> CoreResult<StepResult> {
        let deps = self.deps;
        let step = PipelineStep::Summary;
        let content_excerpt = excerpt(&document.content, 1500);

        let template = deps.templates.analysis(step, &deps.settings.prompt_language).await?;
        let analysis_prompt = render(
            &template,
            &[("document_content", excerpt(&document.content, 6000).as_str())],
        );
        let confirm_template = deps.templates.confirm(step, &deps.settings.prompt_language).await?;
        let confirm_excerpt = content_excerpt.clone();

        let config = LoopConfig {
            step,
            schema: SummaryAnalysis::schema(),
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
            tools_enabled: false,
        };

        let engine = ConfirmationEngine {
            large: deps.large.as_ref(),
            small: deps.small.as_ref(),
            tools: None,
            logger: &deps.logger,
        };
        let outcome = engine.run(document.id, &config).await;

        if !outcome.confirmed {
            let mut result = StepResult::failure(
                step,
                outcome.error.unwrap_or_else(|| "summary not confirmed".to_string()),
            )
            .with_attempts(outcome.attempts);
            result.needs_review = true;
            return Ok(result);
        }

        let analysis: SummaryAnalysis =
            serde_json::from_value(outcome.analysis.clone().unwrap_or(json!({})))?;

        // Store into a `summary` custom field when the schema has one.
        let fields = deps.dms.list_custom_fields().await?;
        if let Some(field) = fields.iter().find(|f| f.name.eq_ignore_ascii_case("summary")) {
            let mut values = document.custom_fields.clone();
            match values.iter_mut().find(|v| v.field == field.id) {
                Some(existing) => existing.value = json!(analysis.summary.clone()),
                None => values.push(CustomFieldValue {
                    field: field.id,
                    value: json!(analysis.summary.clone()),
                }),
            }
            deps.dms
                .update_document(
                    document.id,
                    &DocumentPatch { custom_fields: Some(values), ..Default::default() },
                )
                .await?;
        }

        let tag_names = deps.document_tag_names(document).await?;
        let from_tag = deps.current_state_tag(&tag_names);
        deps.dms
            .transition_tag(document.id, &from_tag, &deps.settings.workflow.summary_done)
            .await?;

        let mut result = StepResult::success(step).with_attempts(outcome.attempts);
        result.value = Some(analysis.summary);
        result.reasoning = Some(analysis.reasoning);
        Ok(result)
    }
}
