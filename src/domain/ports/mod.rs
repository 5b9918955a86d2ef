//! Domain ports (interfaces) for the scrivener core.

pub mod document_store;
pub mod language_model;
pub mod log_store;
pub mod metadata_store;
pub mod review_store;
pub mod settings_store;
pub mod vector_search;

pub use document_store::DocumentStore;
pub use language_model::{
    ChatMessage, ChatResponse, ChatRole, GenerateOptions, LanguageModel, ModelTurn,
    ToolCallRequest, ToolSpec, VisionModel,
};
pub use log_store::LogRepository;
pub use metadata_store::{AnnotationRepository, TemplateRepository};
pub use review_store::{BlocklistRepository, ReviewRepository};
pub use settings_store::SettingsRepository;
pub use vector_search::{SimilarDocument, VectorRecord, VectorSearch};
