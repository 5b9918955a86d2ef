//! Wire types for the DMS REST API.

use serde::{Deserialize, Serialize};

use crate::domain::models::{CustomFieldValue, Document};

/// Envelope of every DMS list endpoint. Pagination is follow-`next`-link.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PaginatedResponse<T> {
    pub count: usize,
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDocument {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub correspondent: Option<i64>,
    pub document_type: Option<i64>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub custom_fields: Vec<ApiCustomFieldValue>,
    #[serde(default)]
    pub content: String,
    pub created: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCustomFieldValue {
    pub field: i64,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl From<ApiDocument> for Document {
    fn from(api: ApiDocument) -> Self {
        Document {
            id: api.id,
            title: api.title,
            correspondent: api.correspondent,
            document_type: api.document_type,
            tags: api.tags,
            custom_fields: api
                .custom_fields
                .into_iter()
                .map(|f| CustomFieldValue { field: f.field, value: f.value })
                .collect(),
            content: api.content,
            created: api.created,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub document_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiNamedEntity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub document_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCustomField {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub data_type: String,
}

/// Body for entity creation.
#[derive(Debug, Serialize)]
pub struct CreateEntityRequest<'a> {
    pub name: &'a str,
}
