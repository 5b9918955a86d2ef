//! Workflow tags and the pipeline state derived from them.
//!
//! Pipeline position is encoded in the document's own tag set so it stays
//! visible and editable in the DMS UI. The state is always derived, never
//! stored: the highest-precedence workflow tag present wins, and stale
//! lower-precedence tags are tolerated until the next transition cleans
//! them up.

use serde::{Deserialize, Serialize};

use super::settings::StepFlags;

/// The ten reserved tag names that encode pipeline state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTags {
    pub pending: String,
    pub ocr_done: String,
    pub summary_done: String,
    pub title_done: String,
    pub correspondent_done: String,
    pub document_type_done: String,
    pub tags_done: String,
    pub processed: String,
    pub failed: String,
    pub manual_review: String,
}

impl Default for WorkflowTags {
    fn default() -> Self {
        Self {
            pending: "llm:pending".to_string(),
            ocr_done: "llm:ocr-done".to_string(),
            summary_done: "llm:summary-done".to_string(),
            title_done: "llm:title-done".to_string(),
            correspondent_done: "llm:correspondent-done".to_string(),
            document_type_done: "llm:document-type-done".to_string(),
            tags_done: "llm:tags-done".to_string(),
            processed: "llm:processed".to_string(),
            failed: "llm:failed".to_string(),
            manual_review: "llm:manual-review".to_string(),
        }
    }
}

impl WorkflowTags {
    /// All ten reserved names.
    pub fn all(&self) -> [&str; 10] {
        [
            &self.pending,
            &self.ocr_done,
            &self.summary_done,
            &self.title_done,
            &self.correspondent_done,
            &self.document_type_done,
            &self.tags_done,
            &self.processed,
            &self.failed,
            &self.manual_review,
        ]
    }

    /// The monotonic state tags in eligibility-scan order (lowest first,
    /// `processed` excluded since it marks completion).
    pub fn scan_order(&self) -> [&str; 7] {
        [
            &self.pending,
            &self.ocr_done,
            &self.summary_done,
            &self.title_done,
            &self.correspondent_done,
            &self.document_type_done,
            &self.tags_done,
        ]
    }

    pub fn is_workflow_tag(&self, name: &str) -> bool {
        self.all().iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Whether a proposed tag name collides with the workflow namespace.
    /// Covers both exact names and anything sharing the reserved prefix.
    pub fn is_reserved_name(&self, name: &str) -> bool {
        if self.is_workflow_tag(name) {
            return true;
        }
        self.prefix()
            .map(|p| name.to_ascii_lowercase().starts_with(&p.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Common prefix of the configured workflow tag names, if they share one
    /// up to the first separator (e.g. `llm:`).
    fn prefix(&self) -> Option<&str> {
        let first = self.pending.split_inclusive([':', '-', '_']).next()?;
        if first.len() < self.pending.len() && self.all().iter().all(|t| t.starts_with(first)) {
            Some(first)
        } else {
            None
        }
    }

    pub fn tag_for_state(&self, state: PipelineState) -> &str {
        match state {
            PipelineState::Pending => &self.pending,
            PipelineState::OcrDone => &self.ocr_done,
            PipelineState::SummaryDone => &self.summary_done,
            PipelineState::TitleDone => &self.title_done,
            PipelineState::CorrespondentDone => &self.correspondent_done,
            PipelineState::DocumentTypeDone => &self.document_type_done,
            PipelineState::TagsDone => &self.tags_done,
            PipelineState::Processed => &self.processed,
        }
    }
}

/// Derived pipeline position. Ordering follows precedence: a later state
/// always wins over an earlier one when multiple workflow tags are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    OcrDone,
    SummaryDone,
    TitleDone,
    CorrespondentDone,
    DocumentTypeDone,
    TagsDone,
    Processed,
}

impl PipelineState {
    /// Derive the state from a document's tag names. Unknown tags are
    /// ignored; a document with no workflow tag is `Pending`.
    pub fn from_tag_names<S: AsRef<str>>(names: &[S], workflow: &WorkflowTags) -> Self {
        let mut state = PipelineState::Pending;
        for name in names {
            let name = name.as_ref();
            let candidate = if name.eq_ignore_ascii_case(&workflow.processed) {
                PipelineState::Processed
            } else if name.eq_ignore_ascii_case(&workflow.tags_done) {
                PipelineState::TagsDone
            } else if name.eq_ignore_ascii_case(&workflow.document_type_done) {
                PipelineState::DocumentTypeDone
            } else if name.eq_ignore_ascii_case(&workflow.correspondent_done) {
                PipelineState::CorrespondentDone
            } else if name.eq_ignore_ascii_case(&workflow.title_done) {
                PipelineState::TitleDone
            } else if name.eq_ignore_ascii_case(&workflow.summary_done) {
                PipelineState::SummaryDone
            } else if name.eq_ignore_ascii_case(&workflow.ocr_done) {
                PipelineState::OcrDone
            } else {
                continue;
            };
            state = state.max(candidate);
        }
        state
    }

    pub fn precedence(&self) -> u8 {
        *self as u8
    }

    /// The step that moves a document out of this state, given the per-step
    /// enable flags. The summary step only appears when enabled; disabled
    /// states elsewhere still return their step so the orchestrator can
    /// auto-transition it.
    pub fn next_step(&self, flags: &StepFlags) -> Option<PipelineStep> {
        match self {
            PipelineState::Pending => Some(PipelineStep::Ocr),
            PipelineState::OcrDone if flags.summary => Some(PipelineStep::Summary),
            PipelineState::OcrDone => Some(PipelineStep::Title),
            PipelineState::SummaryDone => Some(PipelineStep::Title),
            PipelineState::TitleDone => Some(PipelineStep::Correspondent),
            PipelineState::CorrespondentDone => Some(PipelineStep::DocumentType),
            PipelineState::DocumentTypeDone => Some(PipelineStep::Tags),
            PipelineState::TagsDone => Some(PipelineStep::CustomFields),
            PipelineState::Processed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OcrDone => "ocr_done",
            Self::SummaryDone => "summary_done",
            Self::TitleDone => "title_done",
            Self::CorrespondentDone => "correspondent_done",
            Self::DocumentTypeDone => "document_type_done",
            Self::TagsDone => "tags_done",
            Self::Processed => "processed",
        }
    }
}

/// One pipeline step, owned by one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Ocr,
    Summary,
    Title,
    Correspondent,
    DocumentType,
    Tags,
    CustomFields,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::Summary => "summary",
            Self::Title => "title",
            Self::Correspondent => "correspondent",
            Self::DocumentType => "document_type",
            Self::Tags => "tags",
            Self::CustomFields => "custom_fields",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ocr" => Some(Self::Ocr),
            "summary" => Some(Self::Summary),
            "title" => Some(Self::Title),
            "correspondent" => Some(Self::Correspondent),
            "document_type" => Some(Self::DocumentType),
            "tags" => Some(Self::Tags),
            "custom_fields" => Some(Self::CustomFields),
            _ => None,
        }
    }

    /// Workflow tag the step leaves behind on success.
    pub fn output_tag<'a>(&self, workflow: &'a WorkflowTags) -> &'a str {
        match self {
            Self::Ocr => &workflow.ocr_done,
            Self::Summary => &workflow.summary_done,
            Self::Title => &workflow.title_done,
            Self::Correspondent => &workflow.correspondent_done,
            Self::DocumentType => &workflow.document_type_done,
            Self::Tags => &workflow.tags_done,
            Self::CustomFields => &workflow.processed,
        }
    }

    pub fn output_state(&self) -> PipelineState {
        match self {
            Self::Ocr => PipelineState::OcrDone,
            Self::Summary => PipelineState::SummaryDone,
            Self::Title => PipelineState::TitleDone,
            Self::Correspondent => PipelineState::CorrespondentDone,
            Self::DocumentType => PipelineState::DocumentTypeDone,
            Self::Tags => PipelineState::TagsDone,
            Self::CustomFields => PipelineState::Processed,
        }
    }

    pub fn enabled(&self, flags: &StepFlags) -> bool {
        match self {
            Self::Ocr => flags.ocr,
            Self::Summary => flags.summary,
            Self::Title => flags.title,
            Self::Correspondent => flags.correspondent,
            Self::DocumentType => flags.document_type,
            Self::Tags => flags.tags,
            Self::CustomFields => flags.custom_fields,
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
