//! Port for the vector store backing similar-document search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CoreResult;

/// One hit from a similarity search: titles and attribute patterns only,
/// never content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarDocument {
    pub document_id: i64,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub correspondent: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    pub score: f64,
}

/// Payload indexed for one document.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub document_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub correspondent: Option<String>,
    pub document_type: Option<String>,
}

#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Search restricted to fully-processed documents.
    async fn search(&self, query: &str, limit: usize) -> CoreResult<Vec<SimilarDocument>>;

    async fn upsert(&self, record: &VectorRecord) -> CoreResult<()>;

    /// Create the collection if missing.
    async fn ensure_collection(&self) -> CoreResult<()>;
}
