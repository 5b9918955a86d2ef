//! OCR agent.
//!
//! The DMS runs its own OCR on ingest; this step only re-extracts through
//! the vision model when that text is missing or too short to be usable.
//! No confirmation loop: extraction either works or the step fails and the
//! next scheduler pass retries it.

use serde_json::json;

use crate::domain::errors::CoreResult;
use crate::domain::models::{Document, DocumentPatch, LogEventType, PipelineStep, StepResult};

use super::super::logger::log_event;
use super::AgentDeps;

pub struct OcrAgent<'a> {
    deps: &'a AgentDeps,
}

impl<'a> OcrAgent<'a> {
    pub fn new(deps: &'a AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, document: &Document) -> CoreResult<StepResult> {
        let deps = self.deps;
        let step = PipelineStep::Ocr;

        let tag_names = deps.document_tag_names(document).await?;
        let from_tag = deps.current_state_tag(&tag_names);
        let to_tag = deps.settings.workflow.ocr_done.clone();

        if document.content.trim().chars().count() >= deps.settings.ocr_min_chars {
            deps.dms.transition_tag(document.id, &from_tag, &to_tag).await?;
            return Ok(StepResult::skipped(step));
        }

        let bytes = deps.dms.download_document(document.id).await?;
        let text = match deps.vision.extract_text(&bytes).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                return Ok(StepResult::failure(step, "vision model extracted no text"));
            }
            Err(error) => {
                log_event(
                    &deps.logger,
                    document.id,
                    step,
                    LogEventType::Error,
                    json!({ "error": error.to_string() }),
                    None,
                );
                return Ok(StepResult::failure(step, error.to_string()));
            }
        };

        deps.dms
            .update_document(document.id, &DocumentPatch::content(&text))
            .await?;
        deps.dms.transition_tag(document.id, &from_tag, &to_tag).await?;

        log_event(
            &deps.logger,
            document.id,
            step,
            LogEventType::Result,
            json!({ "success": true, "extracted_chars": text.chars().count() }),
            None,
        );
        let mut result = StepResult::success(step);
        result.value = Some(format!("{} characters extracted", text.chars().count()));
        Ok(result)
    }
}
