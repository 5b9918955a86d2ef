//! Document-type agent.

use crate::domain::errors::CoreResult;
use crate::domain::models::{Document, PipelineStep, ReviewKind, StepResult};

use super::entity::EntityStep;
use super::AgentDeps;

const SYSTEM_ANALYSIS: &str = "\
You classify scanned documents into document types (invoice, contract, \
statement, …). Prefer an existing type; mark a name as new only when \
nothing in the list fits. Answer in the requested JSON shape.";

const SYSTEM_CONFIRM: &str = "\
You verify document-type classifications. Answer in the requested JSON \
shape, with actionable feedback when rejecting.";

pub struct DocumentTypeAgent<'a> {
    deps: &'a AgentDeps,
}

impl<'a> DocumentTypeAgent<'a> {
    pub fn new(deps: &'a AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, document: &Document) -> CoreResult<StepResult> {
        let candidates = self.deps.dms.list_document_types().await?;
        EntityStep {
            step: PipelineStep::DocumentType,
            kind: ReviewKind::DocumentType,
            system_analysis: SYSTEM_ANALYSIS,
            system_confirm: SYSTEM_CONFIRM,
            candidates_placeholder: "existing_types",
        }
        .run(self.deps, document, candidates)
        .await
    }
}
