//! Port for the external document-management service.
//!
//! The DMS owns documents, tags, correspondents, document types, and custom
//! fields. Implementations never cache: settings may change between calls
//! and tokens may rotate.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::{
    CustomField, Document, DocumentFilter, DocumentPatch, EntityKind, NamedEntity, Tag,
};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, id: i64) -> CoreResult<Document>;

    async fn update_document(&self, id: i64, patch: &DocumentPatch) -> CoreResult<Document>;

    /// Raw document bytes (PDF) for vision OCR.
    async fn download_document(&self, id: i64) -> CoreResult<Vec<u8>>;

    /// Documents carrying the tag, up to `limit`.
    async fn list_by_tag(&self, tag_name: &str, limit: usize) -> CoreResult<Vec<Document>>;

    /// Documents carrying any of the tags, up to `limit`.
    async fn list_by_tags(&self, tag_names: &[String], limit: usize) -> CoreResult<Vec<Document>>;

    /// Every document matching the filter, following pagination to
    /// exhaustion.
    async fn fetch_all_by_filter(&self, filter: &DocumentFilter) -> CoreResult<Vec<Document>>;

    async fn list_tags(&self) -> CoreResult<Vec<Tag>>;
    async fn list_correspondents(&self) -> CoreResult<Vec<NamedEntity>>;
    async fn list_document_types(&self) -> CoreResult<Vec<NamedEntity>>;
    async fn list_custom_fields(&self) -> CoreResult<Vec<CustomField>>;

    /// Case-insensitive lookup, creating on miss. The DMS's canonical
    /// casing is preserved on hits.
    async fn get_or_create_tag(&self, name: &str) -> CoreResult<Tag>;
    async fn get_or_create_correspondent(&self, name: &str) -> CoreResult<NamedEntity>;
    async fn get_or_create_document_type(&self, name: &str) -> CoreResult<NamedEntity>;

    /// No-op when the document already carries the tag.
    async fn add_tag(&self, document_id: i64, tag_name: &str) -> CoreResult<()>;

    /// No-op when the document does not carry the tag.
    async fn remove_tag(&self, document_id: i64, tag_name: &str) -> CoreResult<()>;

    /// Atomic read-modify-write: remove `from`, add `to`, single update.
    /// No-op when the document is already in the target state.
    async fn transition_tag(&self, document_id: i64, from: &str, to: &str) -> CoreResult<()>;

    /// Reassign every document referring to `source_id` onto `target_id`,
    /// then delete the source. Returns the number of documents touched.
    async fn merge_entities(
        &self,
        kind: EntityKind,
        source_id: i64,
        target_id: i64,
    ) -> CoreResult<usize>;

    async fn delete_entity(&self, kind: EntityKind, id: i64) -> CoreResult<()>;

    /// Update a tag's color.
    async fn set_tag_color(&self, tag_id: i64, color: &str) -> CoreResult<()>;

    /// Document count for a tag name; 0 when the tag does not exist.
    async fn count_by_tag(&self, tag_name: &str) -> CoreResult<usize>;
}
