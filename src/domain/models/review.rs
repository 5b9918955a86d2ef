//! Pending reviews, blocked suggestions, and metadata annotations.
//!
//! These are the records the core owns outright: proposals awaiting human
//! action, names the user told us never to suggest again, and user-curated
//! descriptions injected into prompts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a pending review proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    Correspondent,
    DocumentType,
    Tag,
    Title,
    SchemaMerge,
    SchemaDelete,
}

impl ReviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correspondent => "correspondent",
            Self::DocumentType => "document_type",
            Self::Tag => "tag",
            Self::Title => "title",
            Self::SchemaMerge => "schema_merge",
            Self::SchemaDelete => "schema_delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "correspondent" => Some(Self::Correspondent),
            "document_type" => Some(Self::DocumentType),
            "tag" => Some(Self::Tag),
            "title" => Some(Self::Title),
            "schema_merge" => Some(Self::SchemaMerge),
            "schema_delete" => Some(Self::SchemaDelete),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable record of a proposal that requires human action.
///
/// At most one active review exists per `(document_id, kind)`; writing a new
/// one supersedes the previous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
    pub id: Uuid,
    /// Document the proposal targets. Schema cleanup suggestions are not
    /// tied to a single document and use 0 here.
    pub document_id: i64,
    pub document_title: String,
    pub kind: ReviewKind,
    pub suggestion: String,
    pub reasoning: String,
    pub alternatives: Vec<String>,
    pub attempts: u32,
    pub last_feedback: Option<String>,
    /// Workflow tag to move the document to when the review is approved.
    pub next_tag: Option<String>,
    /// Free-form payload: entity ids for merges, proposed tag lists, etc.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PendingReview {
    pub fn new(document_id: i64, kind: ReviewKind, suggestion: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            document_title: String::new(),
            kind,
            suggestion: suggestion.into(),
            reasoning: String::new(),
            alternatives: Vec::new(),
            attempts: 0,
            last_feedback: None,
            next_tag: None,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.document_title = title.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_next_tag(mut self, tag: impl Into<String>) -> Self {
        self.next_tag = Some(tag.into());
        self
    }
}

/// Scope of a blocked suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockScope {
    /// Suppressed for every agent.
    Global,
    /// Suppressed only for the kind it was rejected under.
    Kind,
}

impl BlockScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Kind => "kind",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(Self::Global),
            "kind" => Some(Self::Kind),
            _ => None,
        }
    }
}

/// A suggestion the user rejected with the block flag set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedSuggestion {
    pub id: Uuid,
    pub name: String,
    /// Lowercased, whitespace-collapsed form used for matching.
    pub normalized: String,
    pub scope: BlockScope,
    /// Kind the block applies to when scope is `Kind`.
    pub kind: Option<ReviewKind>,
    pub reason: Option<String>,
    pub category: Option<String>,
    pub document_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl BlockedSuggestion {
    pub fn new(name: impl Into<String>, scope: BlockScope) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            normalized: normalize_name(&name),
            name,
            scope,
            kind: None,
            reason: None,
            category: None,
            document_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this block suppresses `name` for proposals of `kind`.
    pub fn suppresses(&self, name: &str, kind: ReviewKind) -> bool {
        if normalize_name(name) != self.normalized {
            return false;
        }
        match self.scope {
            BlockScope::Global => true,
            BlockScope::Kind => self.kind == Some(kind),
        }
    }
}

/// Lowercase and collapse internal whitespace. Idempotent.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Target of a metadata annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationTarget {
    Tag,
    CustomField,
}

impl AnnotationTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::CustomField => "custom_field",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tag" => Some(Self::Tag),
            "custom_field" => Some(Self::CustomField),
            _ => None,
        }
    }
}

/// Human-curated description of a tag or custom field, injected into
/// analysis prompts as context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataAnnotation {
    pub target: AnnotationTarget,
    /// Id of the tag or custom field in the DMS.
    pub target_id: i64,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    /// When set, the entity is left out of AI candidate lists entirely.
    pub excluded: bool,
}
