//! Title agent.

use serde_json::json;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    Document, DocumentPatch, PipelineStep, ReviewKind, StepResult, TitleAnalysis,
};

use super::super::confirmation_loop::{ConfirmationEngine, LoopConfig};
use super::super::templates::render;
use super::super::tools::ToolRegistry;
use super::{candidate_lines, excerpt, AgentDeps};

const SYSTEM_ANALYSIS: &str = "\
You are an archivist naming scanned documents. Produce one precise title \
in the requested JSON shape; use the tools to study how similar documents \
are titled before deciding.";

const SYSTEM_CONFIRM: &str = "\
You verify title suggestions for scanned documents. Answer in the \
requested JSON shape, with actionable feedback when rejecting.";

pub struct TitleAgent<'a> {
    deps: &'a AgentDeps,
}

impl<'a> TitleAgent<'a> {
    pub fn new(deps: &'a AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, document: &Document) -> CoreResult<StepResult> {
        let deps = self.deps;
        let step = PipelineStep::Title;
        let content_excerpt = excerpt(&document.content, 1500);

        let similar = deps.similar_titles(&content_excerpt, 5).await;
        let template = deps
            .templates
            .analysis(step, &deps.settings.prompt_language)
            .await?;
        let analysis_prompt = render(
            &template,
            &[
                ("similar_titles", candidate_lines(similar).as_str()),
                ("document_content", excerpt(&document.content, 6000).as_str()),
            ],
        );

        let confirm_template = deps
            .templates
            .confirm(step, &deps.settings.prompt_language)
            .await?;
        let confirm_excerpt = content_excerpt.clone();
        let config = LoopConfig {
            step,
            schema: TitleAnalysis::schema(),
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
        let to_tag = deps.settings.workflow.title_done.clone();

        if outcome.confirmed {
            let analysis: TitleAnalysis =
                serde_json::from_value(outcome.analysis.clone().unwrap_or(json!({})))?;
            deps.dms
                .update_document(document.id, &DocumentPatch::title(&analysis.suggested_title))
                .await?;
            deps.dms.transition_tag(document.id, &from_tag, &to_tag).await?;
            deps.reviews.remove_active(document.id, ReviewKind::Title).await?;

            let mut result = StepResult::success(step)
                .with_value(analysis.suggested_title)
                .with_attempts(outcome.attempts);
            result.reasoning = Some(analysis.reasoning);
            result.confidence = Some(analysis.confidence);
            result.alternatives = analysis.based_on_similar;
            return Ok(result);
        }

        let suggestion = outcome
            .analysis
            .as_ref()
            .and_then(|a| a.get("suggested_title"))
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        deps.queue_failure_review(document, ReviewKind::Title, suggestion, &outcome, &to_tag)
            .await?;

        let mut result = StepResult::failure(
            step,
            outcome.error.clone().unwrap_or_else(|| "title not confirmed".to_string()),
        )
        .with_attempts(outcome.attempts);
        result.needs_review = true;
        Ok(result)
    }
}
