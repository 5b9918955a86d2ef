//! Domain models for the scrivener core.

pub mod analysis;
pub mod document;
pub mod processing_log;
pub mod review;
pub mod settings;
pub mod workflow;

pub use analysis::{
    ConfirmationVerdict, CustomFieldsAnalysis, EntityAnalysis, StepResult, SuggestedField,
    SuggestedTag, SummaryAnalysis, TagRemoval, TagsAnalysis, TitleAnalysis,
};
pub use document::{
    CustomField, CustomFieldValue, Document, DocumentFilter, DocumentPatch, EntityKind,
    NamedEntity, Tag,
};
pub use processing_log::{LogEntry, LogEventType};
pub use review::{
    normalize_name, AnnotationTarget, BlockScope, BlockedSuggestion, MetadataAnnotation,
    PendingReview, ReviewKind,
};
pub use settings::{Settings, StepFlags};
pub use workflow::{PipelineState, PipelineStep, WorkflowTags};
