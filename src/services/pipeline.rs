//! Pipeline orchestrator.
//!
//! One call runs exactly one step: the next step is derived from the
//! document's tag-encoded state unless the caller pins a specific step
//! (manual per-step retries bypass the tag gating). Sequencing across
//! steps is the scheduler's job, driven by the tag transitions each step
//! leaves behind.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    Document, LogEventType, PipelineState, PipelineStep, StepResult,
};

use super::agents::{
    AgentDeps, CorrespondentAgent, CustomFieldsAgent, DocumentTypeAgent, OcrAgent, SummaryAgent,
    TagsAgent, TitleAgent,
};
use super::events::{PipelineEvent, PipelineEventType};
use super::logger::log_event;

/// Result of one `process_document` call.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The document is already fully processed.
    Completed,
    /// One step ran (or was auto-skipped).
    Ran(StepResult),
}

/// Abstraction consumed by the scheduler so tests can substitute the
/// whole pipeline.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process_document(
        &self,
        document_id: i64,
        step: Option<PipelineStep>,
    ) -> CoreResult<PipelineOutcome>;
}

#[derive(Clone)]
pub struct Pipeline {
    deps: AgentDeps,
}

impl Pipeline {
    pub fn new(deps: AgentDeps) -> Self {
        Self { deps }
    }

    /// Next step for a document given its current tags, or `None` when the
    /// document is processed.
    fn derive_step(&self, tag_names: &[String]) -> Option<PipelineStep> {
        let state = PipelineState::from_tag_names(tag_names, &self.deps.settings.workflow);
        state.next_step(&self.deps.settings.steps)
    }

    async fn run_step(&self, step: PipelineStep, document: &Document) -> CoreResult<StepResult> {
        let deps = &self.deps;

        // A disabled step transitions without touching any model. The
        // summary step is only reachable here via an explicit step
        // argument, since derivation skips it when disabled.
        if !step.enabled(&deps.settings.steps) {
            let tag_names = deps.document_tag_names(document).await?;
            let from_tag = deps.current_state_tag(&tag_names);
            let to_tag = step.output_tag(&deps.settings.workflow).to_string();
            deps.dms.transition_tag(document.id, &from_tag, &to_tag).await?;
            log_event(
                &deps.logger,
                document.id,
                step,
                LogEventType::StateTransition,
                json!({ "from": from_tag, "to": to_tag, "disabled": true }),
                None,
            );
            return Ok(StepResult::skipped(step));
        }

        match step {
            PipelineStep::Ocr => OcrAgent::new(deps).run(document).await,
            PipelineStep::Summary => SummaryAgent::new(deps).run(document).await,
            PipelineStep::Title => TitleAgent::new(deps).run(document).await,
            PipelineStep::Correspondent => CorrespondentAgent::new(deps).run(document).await,
            PipelineStep::DocumentType => DocumentTypeAgent::new(deps).run(document).await,
            PipelineStep::Tags => TagsAgent::new(deps).run(document).await,
            PipelineStep::CustomFields => CustomFieldsAgent::new(deps).run(document).await,
        }
    }

    /// Streaming variant: runs the same single step, emitting progress
    /// events while it goes. The receiver sees `pipeline_complete` last.
    pub fn process_document_stream(
        &self,
        document_id: i64,
        step: Option<PipelineStep>,
    ) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut pipeline = self.clone();
        pipeline.deps.logger =
            pipeline.deps.logger.take().map(|l| l.with_stream(tx.clone()));

        tokio::spawn(async move {
            let _ = tx.send(PipelineEvent::new(
                PipelineEventType::PipelineStart,
                None,
                json!({ "document_id": document_id }),
            ));

            match pipeline.process_inner(document_id, step, Some(&tx)).await {
                Ok(PipelineOutcome::Completed) => {
                    let _ = tx.send(PipelineEvent::new(
                        PipelineEventType::PipelineComplete,
                        None,
                        json!({ "document_id": document_id, "status": "completed" }),
                    ));
                }
                Ok(PipelineOutcome::Ran(result)) => {
                    let _ = tx.send(PipelineEvent::new(
                        PipelineEventType::PipelineComplete,
                        Some(result.step),
                        json!({ "document_id": document_id, "success": result.success }),
                    ));
                }
                Err(error) => {
                    let _ = tx.send(PipelineEvent::new(
                        PipelineEventType::StepError,
                        step,
                        json!({ "error": error.to_string() }),
                    ));
                    let _ = tx.send(PipelineEvent::new(
                        PipelineEventType::PipelineComplete,
                        step,
                        json!({ "document_id": document_id, "success": false }),
                    ));
                }
            }
        });

        rx
    }

    async fn process_inner(
        &self,
        document_id: i64,
        step: Option<PipelineStep>,
        stream: Option<&mpsc::UnboundedSender<PipelineEvent>>,
    ) -> CoreResult<PipelineOutcome> {
        let deps = &self.deps;
        deps.settings.require_dms()?;

        // One snapshot to pick the step; agents re-read live state.
        let document = deps.dms.get_document(document_id).await?;
        let tag_names = deps.document_tag_names(&document).await?;

        let step = match step {
            Some(step) => step,
            None => match self.derive_step(&tag_names) {
                Some(step) => step,
                None => return Ok(PipelineOutcome::Completed),
            },
        };

        if let Some(tx) = stream {
            let _ = tx.send(PipelineEvent::new(
                PipelineEventType::StepStart,
                Some(step),
                json!({ "document_id": document_id }),
            ));
        }
        tracing::info!(document_id, step = %step, "running pipeline step");

        let result = self.run_step(step, &document).await?;

        if let Some(tx) = stream {
            let event_type = if !result.success {
                PipelineEventType::StepError
            } else if result.needs_review {
                PipelineEventType::NeedsReview
            } else {
                PipelineEventType::StepComplete
            };
            let _ = tx.send(PipelineEvent::new(
                event_type,
                Some(step),
                serde_json::to_value(&result).unwrap_or(json!({})),
            ));
        }

        Ok(PipelineOutcome::Ran(result))
    }
}

#[async_trait]
impl DocumentProcessor for Pipeline {
    async fn process_document(
        &self,
        document_id: i64,
        step: Option<PipelineStep>,
    ) -> CoreResult<PipelineOutcome> {
        self.process_inner(document_id, step, None).await
    }
}

/// Convenience alias used by the scheduler.
pub type SharedProcessor = Arc<dyn DocumentProcessor>;
