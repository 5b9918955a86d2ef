//! Processing-log entries.
//!
//! One row per event in a confirmation loop. Entries form a forest via
//! `parent_id` so a UI can render a document's reasoning as an expandable
//! tree; emit order is preserved within a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEventType {
    Prompt,
    Response,
    Thinking,
    ToolCall,
    ToolResult,
    Confirming,
    Retry,
    Result,
    Error,
    Context,
    StateTransition,
}

impl LogEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Response => "response",
            Self::Thinking => "thinking",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
            Self::Confirming => "confirming",
            Self::Retry => "retry",
            Self::Result => "result",
            Self::Error => "error",
            Self::Context => "context",
            Self::StateTransition => "state_transition",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prompt" => Some(Self::Prompt),
            "response" => Some(Self::Response),
            "thinking" => Some(Self::Thinking),
            "tool_call" => Some(Self::ToolCall),
            "tool_result" => Some(Self::ToolResult),
            "confirming" => Some(Self::Confirming),
            "retry" => Some(Self::Retry),
            "result" => Some(Self::Result),
            "error" => Some(Self::Error),
            "context" => Some(Self::Context),
            "state_transition" => Some(Self::StateTransition),
            _ => None,
        }
    }
}

/// One observability record from a document run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub document_id: i64,
    pub timestamp: DateTime<Utc>,
    /// Pipeline step that produced the event.
    pub step: String,
    pub event: LogEventType,
    pub payload: serde_json::Value,
    pub parent_id: Option<Uuid>,
}

impl LogEntry {
    pub fn new(
        document_id: i64,
        step: impl Into<String>,
        event: LogEventType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            timestamp: Utc::now(),
            step: step.into(),
            event,
            payload,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent: Uuid) -> Self {
        self.parent_id = Some(parent);
        self
    }
}
