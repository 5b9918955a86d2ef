//! Structured analysis outputs and the shared step result.
//!
//! Each agent forces the large model into one of these shapes; the JSON
//! schemas handed to the model live next to the structs they produce.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::workflow::PipelineStep;

/// Verdict of the confirmation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationVerdict {
    pub confirmed: bool,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub suggested_changes: String,
}

impl ConfirmationVerdict {
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "confirmed": { "type": "boolean" },
                "feedback": { "type": "string" },
                "suggested_changes": { "type": "string" }
            },
            "required": ["confirmed"]
        })
    }
}

/// Title agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleAnalysis {
    pub suggested_title: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub based_on_similar: Vec<String>,
}

impl TitleAnalysis {
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "suggested_title": { "type": "string" },
                "reasoning": { "type": "string" },
                "confidence": { "type": "number" },
                "based_on_similar": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["suggested_title", "reasoning"]
        })
    }
}

/// Correspondent and document-type agents share this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAnalysis {
    pub suggested_name: String,
    /// True when no existing entity fits and a new one should be created.
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub existing_id: Option<i64>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl EntityAnalysis {
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "suggested_name": { "type": "string" },
                "is_new": { "type": "boolean" },
                "existing_id": { "type": ["integer", "null"] },
                "reasoning": { "type": "string" },
                "confidence": { "type": "number" },
                "alternatives": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["suggested_name", "is_new", "reasoning"]
        })
    }
}

/// One proposed tag from the tags agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedTag {
    pub name: String,
    pub is_new: bool,
    #[serde(default)]
    pub existing_tag_id: Option<i64>,
    #[serde(default)]
    pub relevance: f64,
}

/// One removal proposed by the tags agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRemoval {
    pub tag_name: String,
    #[serde(default)]
    pub reason: String,
}

/// Tags agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsAnalysis {
    #[serde(default)]
    pub suggested_tags: Vec<SuggestedTag>,
    #[serde(default)]
    pub tags_to_remove: Vec<TagRemoval>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: f64,
}

impl TagsAnalysis {
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "suggested_tags": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "is_new": { "type": "boolean" },
                            "existing_tag_id": { "type": ["integer", "null"] },
                            "relevance": { "type": "number" }
                        },
                        "required": ["name", "is_new"]
                    }
                },
                "tags_to_remove": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "tag_name": { "type": "string" },
                            "reason": { "type": "string" }
                        },
                        "required": ["tag_name"]
                    }
                },
                "reasoning": { "type": "string" },
                "confidence": { "type": "number" }
            },
            "required": ["suggested_tags", "reasoning"]
        })
    }
}

/// One proposed custom-field value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedField {
    pub field_id: i64,
    pub value: serde_json::Value,
    #[serde(default)]
    pub reasoning: String,
}

/// Custom-fields agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldsAnalysis {
    #[serde(default)]
    pub fields: Vec<SuggestedField>,
    #[serde(default)]
    pub reasoning: String,
}

impl CustomFieldsAnalysis {
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "fields": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "field_id": { "type": "integer" },
                            "value": {},
                            "reasoning": { "type": "string" }
                        },
                        "required": ["field_id", "value"]
                    }
                },
                "reasoning": { "type": "string" }
            },
            "required": ["fields"]
        })
    }
}

/// Summary agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryAnalysis {
    pub summary: String,
    #[serde(default)]
    pub reasoning: String,
}

impl SummaryAnalysis {
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string" },
                "reasoning": { "type": "string" }
            },
            "required": ["summary"]
        })
    }
}

/// Shared result contract of every agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: PipelineStep,
    pub success: bool,
    /// Step was a no-op: disabled, or nothing to do.
    pub skipped: bool,
    /// Primary applied or proposed value, when one exists.
    pub value: Option<String>,
    pub reasoning: Option<String>,
    pub confidence: Option<f64>,
    pub alternatives: Vec<String>,
    pub attempts: u32,
    pub needs_review: bool,
    pub error: Option<String>,
}

impl StepResult {
    pub fn success(step: PipelineStep) -> Self {
        Self {
            step,
            success: true,
            skipped: false,
            value: None,
            reasoning: None,
            confidence: None,
            alternatives: Vec::new(),
            attempts: 0,
            needs_review: false,
            error: None,
        }
    }

    pub fn skipped(step: PipelineStep) -> Self {
        Self { skipped: true, ..Self::success(step) }
    }

    pub fn failure(step: PipelineStep, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(step)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}
