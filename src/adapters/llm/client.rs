//! HTTP client for the model server.
//!
//! Speaks a chat-completion API with schema-constrained output (`format`),
//! tool-call messages, and an optional thinking side-channel. The large and
//! small logical models are two instances of this client pointed at the
//! models named in settings.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ports::{
    ChatMessage, ChatResponse, ChatRole, GenerateOptions, LanguageModel, ModelTurn,
    ToolCallRequest, ToolSpec, VisionModel,
};

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Default sampling temperature when the caller does not set one.
    pub temperature: f32,
}

impl LlmClientConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs: 300,
            temperature: 0.7,
        }
    }

    /// Low-temperature profile for the confirmation model.
    pub fn verifier(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { temperature: 0.1, ..Self::new(base_url, model) }
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmClientConfig,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a ToolSpec,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
    options: WireOptions,
}

#[derive(Serialize)]
struct WireOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireToolFunction,
}

#[derive(Deserialize)]
struct WireToolFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl LlmClient {
    pub fn new(config: LlmClientConfig) -> CoreResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::transport("llm", e.to_string()))?;
        Ok(Self { http, config })
    }

    fn wire_role(role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }

    fn wire_messages<'a>(messages: &'a [ChatMessage]) -> Vec<WireMessage<'a>> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: Self::wire_role(m.role),
                content: &m.content,
                tool_name: m.tool_name.as_deref(),
                images: None,
            })
            .collect()
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> CoreResult<ChatCompletion> {
        let url = format!("{}/api/chat", self.config.base_url.trim_end_matches('/'));
        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Structured-output violations come back as 4xx and are not
            // retryable at the transport level.
            if status.is_client_error() {
                return Err(CoreError::Analysis(format!("HTTP {status}: {body}")));
            }
            return Err(CoreError::transport("llm", format!("HTTP {status}: {body}")));
        }
        Ok(response.json().await?)
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: Self::wire_messages(messages),
            stream: false,
            format: None,
            tools: None,
            think: None,
            options: WireOptions { temperature: self.config.temperature },
        }
    }
}

/// Split a `<think>…</think>` prefix off a response body. Falls back to the
/// envelope's thinking field when no prefix is present.
fn extract_thinking(content: &str, envelope: Option<String>) -> (String, Option<String>) {
    let trimmed = content.trim_start();
    if let Some(rest) = trimmed.strip_prefix("<think>") {
        if let Some(end) = rest.find("</think>") {
            let thinking = rest[..end].trim().to_string();
            let body = rest[end + "</think>".len()..].trim_start().to_string();
            let thinking = if thinking.is_empty() { None } else { Some(thinking) };
            return (body, thinking.or(envelope));
        }
    }
    (content.to_string(), envelope.filter(|t| !t.trim().is_empty()))
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> CoreResult<ChatResponse> {
        let mut request = self.request(messages);
        if let Some(t) = options.temperature {
            request.options.temperature = t;
        }
        if options.json {
            request.format = Some(serde_json::Value::String("json".to_string()));
        }
        if options.think {
            request.think = Some(true);
        }
        let completion = self.chat(&request).await?;
        let (content, thinking) =
            extract_thinking(&completion.message.content, completion.message.thinking);
        Ok(ChatResponse { content, thinking })
    }

    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        schema: &serde_json::Value,
    ) -> CoreResult<(serde_json::Value, Option<String>)> {
        let mut request = self.request(messages);
        request.format = Some(schema.clone());
        let completion = self.chat(&request).await?;
        let (content, thinking) =
            extract_thinking(&completion.message.content, completion.message.thinking);
        if content.trim().is_empty() {
            return Err(CoreError::Analysis("model returned an empty analysis".to_string()));
        }
        let value: serde_json::Value = serde_json::from_str(content.trim())
            .map_err(|e| CoreError::Analysis(format!("structured output did not parse: {e}")))?;
        Ok((value, thinking))
    }

    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        schema: &serde_json::Value,
    ) -> CoreResult<ModelTurn> {
        let mut request = self.request(messages);
        request.tools = Some(
            tools
                .iter()
                .map(|t| WireTool { tool_type: "function", function: t })
                .collect(),
        );
        let completion = self.chat(&request).await?;
        let (content, thinking) =
            extract_thinking(&completion.message.content, completion.message.thinking);

        if !completion.message.tool_calls.is_empty() {
            let calls = completion
                .message
                .tool_calls
                .into_iter()
                .map(|c| ToolCallRequest {
                    name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect();
            return Ok(ModelTurn::ToolCalls { calls, thinking });
        }

        // No tool calls: the answer must satisfy the structured shape.
        // Tool-bound calls cannot also be format-constrained, so parse here.
        let value: serde_json::Value = serde_json::from_str(content.trim()).map_err(|e| {
            CoreError::Analysis(format!(
                "tool-bound response was neither tool calls nor parseable {}: {e}",
                schema_summary(schema)
            ))
        })?;
        Ok(ModelTurn::Structured { value, thinking })
    }
}

fn schema_summary(schema: &serde_json::Value) -> String {
    schema
        .get("properties")
        .and_then(|p| p.as_object())
        .map(|p| format!("object({})", p.keys().cloned().collect::<Vec<_>>().join(", ")))
        .unwrap_or_else(|| "structured output".to_string())
}

#[async_trait]
impl VisionModel for LlmClient {
    async fn extract_text(&self, document_bytes: &[u8]) -> CoreResult<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(document_bytes);
        let prompt = "Extract all text from this document verbatim. \
                      Preserve the reading order. Output only the extracted text.";
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
                tool_name: None,
                images: Some(vec![encoded]),
            }],
            stream: false,
            format: None,
            tools: None,
            think: None,
            options: WireOptions { temperature: 0.0 },
        };
        let completion = self.chat(&request).await?;
        let (content, _) =
            extract_thinking(&completion.message.content, completion.message.thinking);
        Ok(content)
    }
}
