//! Correspondent agent.

use crate::domain::errors::CoreResult;
use crate::domain::models::{Document, PipelineStep, ReviewKind, StepResult};

use super::entity::EntityStep;
use super::AgentDeps;

const SYSTEM_ANALYSIS: &str = "\
You identify the correspondent (sender or institution) of scanned \
documents. Prefer an existing correspondent; mark a name as new only when \
nothing in the list fits. Answer in the requested JSON shape.";

const SYSTEM_CONFIRM: &str = "\
You verify correspondent assignments. Confirm only when the name is \
supported by the document; answer in the requested JSON shape.";

pub struct CorrespondentAgent<'a> {
    deps: &'a AgentDeps,
}

impl<'a> CorrespondentAgent<'a> {
    pub fn new(deps: &'a AgentDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, document: &Document) -> CoreResult<StepResult> {
        let candidates = self.deps.dms.list_correspondents().await?;
        EntityStep {
            step: PipelineStep::Correspondent,
            kind: ReviewKind::Correspondent,
            system_analysis: SYSTEM_ANALYSIS,
            system_confirm: SYSTEM_CONFIRM,
            candidates_placeholder: "existing_correspondents",
        }
        .run(self.deps, document, candidates)
        .await
    }
}
