//! Ports for metadata annotations and prompt templates.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::{AnnotationTarget, MetadataAnnotation};

#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    async fn upsert(&self, annotation: &MetadataAnnotation) -> CoreResult<()>;

    async fn list(&self, target: AnnotationTarget) -> CoreResult<Vec<MetadataAnnotation>>;

    async fn remove(&self, target: AnnotationTarget, target_id: i64) -> CoreResult<()>;
}

/// User overrides for the built-in prompt templates, keyed by step and
/// language code.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn get(&self, step: &str, language: &str) -> CoreResult<Option<String>>;

    async fn set(&self, step: &str, language: &str, content: &str) -> CoreResult<()>;

    async fn remove(&self, step: &str, language: &str) -> CoreResult<()>;

    /// All `(step, language)` pairs with an override.
    async fn list(&self) -> CoreResult<Vec<(String, String)>>;
}
