//! Documents and the DMS-owned entities attached to them.
//!
//! The DMS is the source of truth for everything in this module; the core
//! reads and patches these records but never stores them.

use serde::{Deserialize, Serialize};

/// A document as seen through the DMS API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub correspondent: Option<i64>,
    pub document_type: Option<i64>,
    /// Tag ids, workflow and content tags mixed.
    pub tags: Vec<i64>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
    /// OCR text content. Empty when the DMS has not extracted any.
    #[serde(default)]
    pub content: String,
    pub created: Option<chrono::DateTime<chrono::Utc>>,
}

impl Document {
    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tags.contains(&tag_id)
    }
}

/// A DMS tag. Workflow tags are distinguished only by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub document_count: i64,
}

/// A correspondent or document type: the DMS models both as id + unique name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub document_count: i64,
}

/// Custom field definition from the DMS schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub data_type: String,
}

/// A `{field_id, value}` pair attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub field: i64,
    pub value: serde_json::Value,
}

/// Partial update for a document. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correspondent: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<CustomFieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DocumentPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Default::default() }
    }

    pub fn tags(tags: Vec<i64>) -> Self {
        Self { tags: Some(tags), ..Default::default() }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Default::default() }
    }
}

/// Kinds of DMS entity the core can create, merge, or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tag,
    Correspondent,
    DocumentType,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Correspondent => "correspondent",
            Self::DocumentType => "document_type",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side filter for document listings. At most one of the name filters
/// is set per query; the adapter resolves names to ids before filtering.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub tag_name: Option<String>,
    pub any_tag_names: Option<Vec<String>>,
    pub correspondent_name: Option<String>,
    pub document_type_name: Option<String>,
    pub custom_field: Option<(String, Option<String>)>,
}
