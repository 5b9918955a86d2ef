//! Ports for the language models.
//!
//! Two logical models drive every confirmation loop: a large reasoning
//! model (structured output, tool use) and a small verifier (low
//! temperature, no tools). A vision model backs OCR re-extraction. All
//! three are named by settings and may share one endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Set on `Tool` messages: which tool produced the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into(), tool_name: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into(), tool_name: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into(), tool_name: None }
    }

    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_name: Some(tool_name.into()),
        }
    }
}

/// Options for a free-form generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    /// Constrain output to JSON without a specific schema.
    pub json: bool,
    /// Ask the model to emit reasoning through its thinking channel.
    pub think: bool,
}

/// A full (non-streamed) model response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    /// Reasoning extracted from a `<think>` prefix or the response
    /// envelope's side-channel, uniformly surfaced or absent.
    pub thinking: Option<String>,
}

/// Declaration of one tool offered to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Outcome of a tool-enabled generation: either the model answered in the
/// requested structure, or it asked for tools.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    Structured {
        value: serde_json::Value,
        thinking: Option<String>,
    },
    ToolCalls {
        calls: Vec<ToolCallRequest>,
        thinking: Option<String>,
    },
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Plain generation, returning the full response.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> CoreResult<ChatResponse>;

    /// Schema-constrained generation. Fails with `CoreError::Analysis` when
    /// the model's output does not parse against the schema.
    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        schema: &serde_json::Value,
    ) -> CoreResult<(serde_json::Value, Option<String>)>;

    /// Tool-enabled generation: the model may answer with the structured
    /// shape or request tool calls.
    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        schema: &serde_json::Value,
    ) -> CoreResult<ModelTurn>;
}

/// Vision model used to re-extract text when the DMS OCR is unusable.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn extract_text(&self, document_bytes: &[u8]) -> CoreResult<String>;
}
