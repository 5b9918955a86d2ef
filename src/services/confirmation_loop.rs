//! The confirmation-loop engine.
//!
//! Every inference step runs the same five-state machine:
//! `analyze → tools → confirm → apply | queue_review`. The large model
//! produces a schema-shaped analysis (optionally after tool-augmented
//! reasoning); the small model confirms or rejects it; rejection feedback
//! is injected into the next analysis attempt until the retry budget runs
//! out and the result is queued for human review.
//!
//! Invariants enforced here, not in the tools or agents:
//! - the attempt counter moves only when a structured analysis is produced,
//! - the tool-call budget is shared across all tool rounds of one run and
//!   charged even for cached duplicates,
//! - duplicate `(tool, args)` calls are served from a per-run cache with a
//!   repeat notice appended,
//! - once the budget is exhausted, the next analyze forces the structured
//!   output path.

use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::models::{ConfirmationVerdict, LogEventType, PipelineStep};
use crate::domain::ports::{ChatMessage, LanguageModel, ModelTurn, ToolCallRequest};

use super::logger::{log_event, LoggerHandle};
use super::tools::ToolRegistry;

/// Configuration of one engine run.
pub struct LoopConfig {
    pub step: PipelineStep,
    /// Schema the analysis must satisfy.
    pub schema: serde_json::Value,
    pub system_analysis: String,
    pub system_confirm: String,
    /// Base user prompt for the analysis phase.
    pub analysis_prompt: String,
    /// Builds the confirmation user prompt from the current analysis.
    pub confirm_prompt: Box<dyn Fn(&serde_json::Value) -> String + Send + Sync>,
    pub max_retries: u32,
    pub tool_budget: u32,
    /// Whether the tool set is offered to the analysis model at all.
    pub tools_enabled: bool,
}

/// Terminal result of a run.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Last structured analysis, possibly `None` when analysis never
    /// produced one.
    pub analysis: Option<serde_json::Value>,
    pub thinking: Option<String>,
    pub confirmed: bool,
    pub attempts: u32,
    pub tool_calls: u32,
    /// Feedback from the last rejection, carried into pending reviews.
    pub last_feedback: Option<String>,
    /// Set when the run ended in `queue_review`.
    pub error: Option<String>,
}

impl LoopOutcome {
    pub fn needs_review(&self) -> bool {
        !self.confirmed
    }
}

pub struct ConfirmationEngine<'a> {
    pub large: &'a dyn LanguageModel,
    pub small: &'a dyn LanguageModel,
    pub tools: Option<&'a ToolRegistry>,
    pub logger: &'a LoggerHandle,
}

impl<'a> ConfirmationEngine<'a> {
    /// Drive the state machine to a terminal state. The engine itself never
    /// fails: analysis and confirmation errors are folded into the outcome.
    pub async fn run(&self, document_id: i64, config: &LoopConfig) -> LoopOutcome {
        let mut attempts: u32 = 0;
        let mut tool_calls_used: u32 = 0;
        let mut feedback: Option<String> = None;
        let mut last_analysis: Option<serde_json::Value> = None;
        let mut last_thinking: Option<String> = None;
        // Tool exchange carried into every subsequent analyze.
        let mut tool_transcript: Vec<ChatMessage> = Vec::new();
        // (tool, canonical args) -> result string, for this run only.
        let mut tool_cache: HashMap<String, String> = HashMap::new();

        loop {
            // analyze
            let prompt_id = self.log(
                document_id,
                config,
                LogEventType::Prompt,
                json!({
                    "system": config.system_analysis,
                    "user": self.analysis_user_prompt(config, feedback.as_deref()),
                    "attempt": attempts + 1,
                }),
                None,
            );

            let messages = self.analysis_messages(config, feedback.as_deref(), &tool_transcript);
            let budget_left = tool_calls_used < config.tool_budget;
            let bind_tools = config.tools_enabled && self.tools.is_some() && budget_left;

            let turn = if bind_tools {
                let registry = self.tools.expect("tools checked above");
                match self
                    .large
                    .generate_with_tools(&messages, &registry.specs(), &config.schema)
                    .await
                {
                    Ok(turn) => turn,
                    Err(error) => {
                        return self.queue_review(
                            document_id,
                            config,
                            last_analysis,
                            last_thinking,
                            attempts,
                            tool_calls_used,
                            feedback,
                            error.to_string(),
                        );
                    }
                }
            } else {
                match self.large.generate_structured(&messages, &config.schema).await {
                    Ok((value, thinking)) => ModelTurn::Structured { value, thinking },
                    Err(error) => {
                        return self.queue_review(
                            document_id,
                            config,
                            last_analysis,
                            last_thinking,
                            attempts,
                            tool_calls_used,
                            feedback,
                            error.to_string(),
                        );
                    }
                }
            };

            let (analysis, thinking) = match turn {
                ModelTurn::ToolCalls { calls, thinking } => {
                    if let Some(thinking) = &thinking {
                        self.log(
                            document_id,
                            config,
                            LogEventType::Thinking,
                            json!({ "thinking": thinking }),
                            prompt_id,
                        );
                    }
                    // tools state: every call is charged against the budget,
                    // cached duplicates included.
                    for call in calls {
                        tool_calls_used += 1;
                        self.run_tool(
                            document_id,
                            config,
                            &call,
                            &mut tool_cache,
                            &mut tool_transcript,
                            prompt_id,
                        )
                        .await;
                    }
                    continue;
                }
                ModelTurn::Structured { value, thinking } => (value, thinking),
            };

            // Structured analysis produced: this is what counts as an attempt.
            attempts += 1;
            if let Some(thinking) = &thinking {
                self.log(
                    document_id,
                    config,
                    LogEventType::Thinking,
                    json!({ "thinking": thinking }),
                    prompt_id,
                );
            }
            self.log(
                document_id,
                config,
                LogEventType::Response,
                json!({ "analysis": analysis, "attempt": attempts }),
                prompt_id,
            );
            last_analysis = Some(analysis.clone());
            last_thinking = thinking;

            // confirm
            self.log(
                document_id,
                config,
                LogEventType::Confirming,
                json!({ "attempt": attempts }),
                prompt_id,
            );
            let verdict = self.confirm(config, &analysis).await;
            if verdict.confirmed {
                self.log(
                    document_id,
                    config,
                    LogEventType::Result,
                    json!({
                        "success": true,
                        "attempts": attempts,
                        "analysis": analysis,
                    }),
                    None,
                );
                return LoopOutcome {
                    analysis: last_analysis,
                    thinking: last_thinking,
                    confirmed: true,
                    attempts,
                    tool_calls: tool_calls_used,
                    last_feedback: feedback,
                    error: None,
                };
            }

            let rejection = if verdict.feedback.trim().is_empty() {
                verdict.suggested_changes.clone()
            } else {
                verdict.feedback.clone()
            };

            if attempts >= config.max_retries {
                return self.queue_review(
                    document_id,
                    config,
                    last_analysis,
                    last_thinking,
                    attempts,
                    tool_calls_used,
                    Some(rejection.clone()),
                    format!("not confirmed after {attempts} attempts"),
                );
            }

            self.log(
                document_id,
                config,
                LogEventType::Retry,
                json!({ "attempt": attempts, "feedback": rejection }),
                prompt_id,
            );
            feedback = Some(rejection);
        }
    }

    fn analysis_user_prompt(&self, config: &LoopConfig, feedback: Option<&str>) -> String {
        match feedback {
            None => config.analysis_prompt.clone(),
            Some(feedback) => format!(
                "{}\n\nYour previous analysis was rejected by the reviewer:\n{}\n\
                 Produce a corrected analysis that addresses this feedback.",
                config.analysis_prompt, feedback
            ),
        }
    }

    fn analysis_messages(
        &self,
        config: &LoopConfig,
        feedback: Option<&str>,
        tool_transcript: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(&config.system_analysis),
            ChatMessage::user(self.analysis_user_prompt(config, feedback)),
        ];
        messages.extend_from_slice(tool_transcript);
        messages
    }

    async fn run_tool(
        &self,
        document_id: i64,
        config: &LoopConfig,
        call: &ToolCallRequest,
        cache: &mut HashMap<String, String>,
        transcript: &mut Vec<ChatMessage>,
        parent: Option<Uuid>,
    ) {
        let key = cache_key(&call.name, &call.arguments);
        let call_id = self.log(
            document_id,
            config,
            LogEventType::ToolCall,
            json!({ "tool": call.name, "arguments": call.arguments }),
            parent,
        );

        transcript.push(ChatMessage::assistant(format!(
            "Calling tool {} with arguments {}",
            call.name, call.arguments
        )));

        let (result, cached) = match cache.get(&key) {
            Some(result) => (result.clone(), true),
            None => {
                let result = match self.tools {
                    Some(registry) => match registry.invoke(&call.name, &call.arguments).await {
                        Ok(result) => result,
                        // Tool failures become the tool's result so the
                        // model can react to them.
                        Err(error) => error.to_string(),
                    },
                    None => "Tools are not available.".to_string(),
                };
                cache.insert(key, result.clone());
                (result, false)
            }
        };

        self.log(
            document_id,
            config,
            LogEventType::ToolResult,
            json!({ "tool": call.name, "result": result, "cached": cached }),
            call_id.or(parent),
        );

        let content = if cached {
            format!(
                "{result}\n[You already made this exact tool call in this run; \
                 this is the cached result.]"
            )
        } else {
            result
        };
        transcript.push(ChatMessage::tool(call.name.clone(), content));
    }

    async fn confirm(
        &self,
        config: &LoopConfig,
        analysis: &serde_json::Value,
    ) -> ConfirmationVerdict {
        let messages = vec![
            ChatMessage::system(&config.system_confirm),
            ChatMessage::user((config.confirm_prompt)(analysis)),
        ];
        match self
            .small
            .generate_structured(&messages, &ConfirmationVerdict::schema())
            .await
        {
            Ok((value, _)) => match serde_json::from_value::<ConfirmationVerdict>(value) {
                Ok(verdict) => verdict,
                // A malformed verdict counts as a rejection with the parse
                // problem as feedback.
                Err(error) => ConfirmationVerdict {
                    confirmed: false,
                    feedback: format!("confirmation response did not parse: {error}"),
                    suggested_changes: String::new(),
                },
            },
            Err(error) => ConfirmationVerdict {
                confirmed: false,
                feedback: format!("confirmation model failed: {error}"),
                suggested_changes: String::new(),
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn queue_review(
        &self,
        document_id: i64,
        config: &LoopConfig,
        analysis: Option<serde_json::Value>,
        thinking: Option<String>,
        attempts: u32,
        tool_calls: u32,
        feedback: Option<String>,
        error: String,
    ) -> LoopOutcome {
        self.log(
            document_id,
            config,
            LogEventType::Error,
            json!({
                "error": error,
                "attempts": attempts,
                "analysis": analysis,
            }),
            None,
        );
        LoopOutcome {
            analysis,
            thinking,
            confirmed: false,
            attempts,
            tool_calls,
            last_feedback: feedback,
            error: Some(error),
        }
    }

    fn log(
        &self,
        document_id: i64,
        config: &LoopConfig,
        event: LogEventType,
        payload: serde_json::Value,
        parent: Option<Uuid>,
    ) -> Option<Uuid> {
        log_event(self.logger, document_id, config.step, event, payload, parent)
    }
}

/// Canonical cache key: tool name plus the arguments re-serialized with
/// sorted keys (serde_json objects are ordered maps).
pub fn cache_key(tool: &str, args: &serde_json::Value) -> String {
    format!("{tool}:{args}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::domain::errors::{CoreError, CoreResult};
    use crate::domain::ports::{ChatResponse, GenerateOptions, ToolSpec};

    /// Model stub that replays a scripted sequence of turns and records
    /// which entry point served each one.
    struct ScriptedModel {
        turns: Mutex<Vec<CoreResult<ModelTurn>>>,
        paths: Mutex<Vec<&'static str>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<CoreResult<ModelTurn>>) -> Self {
            Self { turns: Mutex::new(turns), paths: Mutex::new(Vec::new()) }
        }

        fn structured(value: serde_json::Value) -> CoreResult<ModelTurn> {
            Ok(ModelTurn::Structured { value, thinking: None })
        }

        fn call_count(&self) -> u32 {
            self.paths.lock().unwrap().len() as u32
        }

        fn paths(&self) -> Vec<&'static str> {
            self.paths.lock().unwrap().clone()
        }

        fn next(&self, path: &'static str) -> CoreResult<ModelTurn> {
            self.paths.lock().unwrap().push(path);
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                panic!("scripted model ran out of turns");
            }
            turns.remove(0)
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(
            &self,
            _messages: &[ChatMessage],
            _options: &GenerateOptions,
        ) -> CoreResult<ChatResponse> {
            unimplemented!("not used by the engine")
        }

        async fn generate_structured(
            &self,
            _messages: &[ChatMessage],
            _schema: &serde_json::Value,
        ) -> CoreResult<(serde_json::Value, Option<String>)> {
            match self.next("structured")? {
                ModelTurn::Structured { value, thinking } => Ok((value, thinking)),
                ModelTurn::ToolCalls { .. } => {
                    Err(CoreError::Analysis("tool call on structured path".to_string()))
                }
            }
        }

        async fn generate_with_tools(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolSpec],
            _schema: &serde_json::Value,
        ) -> CoreResult<ModelTurn> {
            self.next("tools")
        }
    }

    fn config(max_retries: u32, tools_enabled: bool) -> LoopConfig {
        LoopConfig {
            step: PipelineStep::Title,
            schema: json!({ "type": "object" }),
            system_analysis: "analyze".to_string(),
            system_confirm: "confirm".to_string(),
            analysis_prompt: "document text".to_string(),
            confirm_prompt: Box::new(|analysis| format!("confirm: {analysis}")),
            max_retries,
            tool_budget: 5,
            tools_enabled,
        }
    }

    fn verdict(confirmed: bool, feedback: &str) -> CoreResult<ModelTurn> {
        ScriptedModel::structured(json!({
            "confirmed": confirmed,
            "feedback": feedback,
            "suggested_changes": ""
        }))
    }

    #[tokio::test]
    async fn confirms_on_first_attempt() {
        let large =
            ScriptedModel::new(vec![ScriptedModel::structured(json!({ "suggested_title": "A" }))]);
        let small = ScriptedModel::new(vec![verdict(true, "")]);
        let engine = ConfirmationEngine { large: &large, small: &small, tools: None, logger: &None };

        let outcome = engine.run(1, &config(3, false)).await;
        assert!(outcome.confirmed);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn rejection_feedback_drives_retry() {
        let large = ScriptedModel::new(vec![
            ScriptedModel::structured(json!({ "suggested_title": "Invoice 0006" })),
            ScriptedModel::structured(json!({ "suggested_title": "PayPal payment" })),
        ]);
        let small = ScriptedModel::new(vec![
            verdict(false, "merchant name missing"),
            verdict(true, ""),
        ]);
        let engine = ConfirmationEngine { large: &large, small: &small, tools: None, logger: &None };

        let outcome = engine.run(42, &config(3, false)).await;
        assert!(outcome.confirmed);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            outcome.analysis.unwrap()["suggested_title"],
            json!("PayPal payment")
        );
    }

    #[tokio::test]
    async fn queues_for_review_after_max_retries() {
        let large = ScriptedModel::new(vec![
            ScriptedModel::structured(json!({ "suggested_title": "bad 1" })),
            ScriptedModel::structured(json!({ "suggested_title": "bad 2" })),
        ]);
        let small = ScriptedModel::new(vec![
            verdict(false, "wrong"),
            verdict(false, "still wrong"),
        ]);
        let engine = ConfirmationEngine { large: &large, small: &small, tools: None, logger: &None };

        let outcome = engine.run(99, &config(2, false)).await;
        assert!(!outcome.confirmed);
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.last_feedback.as_deref(), Some("still wrong"));
        // The last analysis still rides along for the pending review.
        assert!(outcome.analysis.is_some());
    }

    #[tokio::test]
    async fn confirmation_model_error_counts_as_rejection() {
        let large = ScriptedModel::new(vec![
            ScriptedModel::structured(json!({ "suggested_title": "A" })),
            ScriptedModel::structured(json!({ "suggested_title": "B" })),
        ]);
        let small = ScriptedModel::new(vec![
            Err(CoreError::transport("llm", "connection refused")),
            verdict(true, ""),
        ]);
        let engine = ConfirmationEngine { large: &large, small: &small, tools: None, logger: &None };

        let outcome = engine.run(7, &config(3, false)).await;
        assert!(outcome.confirmed);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn analysis_error_goes_straight_to_review() {
        let large = ScriptedModel::new(vec![Err(CoreError::Analysis("no parse".to_string()))]);
        let small = ScriptedModel::new(vec![]);
        let engine = ConfirmationEngine { large: &large, small: &small, tools: None, logger: &None };

        let outcome = engine.run(5, &config(3, false)).await;
        assert!(!outcome.confirmed);
        assert_eq!(outcome.attempts, 0);
        assert!(outcome.analysis.is_none());
        assert!(outcome.error.unwrap().contains("no parse"));
    }

    #[tokio::test]
    async fn terminates_within_retry_bound() {
        // Always-rejecting verifier: analysis rounds are bounded by
        // max_retries.
        let max = 4;
        let large = ScriptedModel::new(
            (0..max)
                .map(|i| ScriptedModel::structured(json!({ "suggested_title": i })))
                .collect(),
        );
        let small =
            ScriptedModel::new((0..max).map(|_| verdict(false, "no")).collect());
        let engine = ConfirmationEngine { large: &large, small: &small, tools: None, logger: &None };

        let outcome = engine.run(1, &config(max, false)).await;
        assert_eq!(outcome.attempts, max);
        assert_eq!(large.call_count(), max);
    }

    mod stubs {
        use super::*;
        use crate::domain::models::{
            CustomField, Document, DocumentFilter, DocumentPatch, EntityKind, NamedEntity, Tag,
        };
        use crate::domain::ports::{DocumentStore, SimilarDocument, VectorRecord, VectorSearch};

        pub struct StubDms;

        #[async_trait]
        impl DocumentStore for StubDms {
            async fn get_document(&self, _id: i64) -> CoreResult<Document> {
                unimplemented!()
            }
            async fn update_document(
                &self,
                _id: i64,
                _patch: &DocumentPatch,
            ) -> CoreResult<Document> {
                unimplemented!()
            }
            async fn download_document(&self, _id: i64) -> CoreResult<Vec<u8>> {
                unimplemented!()
            }
            async fn list_by_tag(&self, _tag: &str, _limit: usize) -> CoreResult<Vec<Document>> {
                Ok(Vec::new())
            }
            async fn list_by_tags(
                &self,
                _tags: &[String],
                _limit: usize,
            ) -> CoreResult<Vec<Document>> {
                Ok(Vec::new())
            }
            async fn fetch_all_by_filter(
                &self,
                _filter: &DocumentFilter,
            ) -> CoreResult<Vec<Document>> {
                Ok(Vec::new())
            }
            async fn list_tags(&self) -> CoreResult<Vec<Tag>> {
                Ok(Vec::new())
            }
            async fn list_correspondents(&self) -> CoreResult<Vec<NamedEntity>> {
                Ok(Vec::new())
            }
            async fn list_document_types(&self) -> CoreResult<Vec<NamedEntity>> {
                Ok(Vec::new())
            }
            async fn list_custom_fields(&self) -> CoreResult<Vec<CustomField>> {
                Ok(vec![CustomField {
                    id: 1,
                    name: "order_number".to_string(),
                    data_type: "string".to_string(),
                }])
            }
            async fn get_or_create_tag(&self, _name: &str) -> CoreResult<Tag> {
                unimplemented!()
            }
            async fn get_or_create_correspondent(&self, _name: &str) -> CoreResult<NamedEntity> {
                unimplemented!()
            }
            async fn get_or_create_document_type(&self, _name: &str) -> CoreResult<NamedEntity> {
                unimplemented!()
            }
            async fn add_tag(&self, _document_id: i64, _tag: &str) -> CoreResult<()> {
                unimplemented!()
            }
            async fn remove_tag(&self, _document_id: i64, _tag: &str) -> CoreResult<()> {
                unimplemented!()
            }
            async fn transition_tag(
                &self,
                _document_id: i64,
                _from: &str,
                _to: &str,
            ) -> CoreResult<()> {
                unimplemented!()
            }
            async fn merge_entities(
                &self,
                _kind: EntityKind,
                _source: i64,
                _target: i64,
            ) -> CoreResult<usize> {
                unimplemented!()
            }
            async fn delete_entity(&self, _kind: EntityKind, _id: i64) -> CoreResult<()> {
                unimplemented!()
            }
            async fn set_tag_color(&self, _tag_id: i64, _color: &str) -> CoreResult<()> {
                unimplemented!()
            }
            async fn count_by_tag(&self, _tag: &str) -> CoreResult<usize> {
                Ok(0)
            }
        }

        pub struct StubVector;

        #[async_trait]
        impl VectorSearch for StubVector {
            async fn search(
                &self,
                _query: &str,
                _limit: usize,
            ) -> CoreResult<Vec<SimilarDocument>> {
                Ok(Vec::new())
            }
            async fn upsert(&self, _record: &VectorRecord) -> CoreResult<()> {
                Ok(())
            }
            async fn ensure_collection(&self) -> CoreResult<()> {
                Ok(())
            }
        }
    }

    fn registry() -> ToolRegistry {
        use crate::domain::models::WorkflowTags;
        use std::sync::Arc;
        ToolRegistry::new(
            Arc::new(stubs::StubDms),
            Arc::new(stubs::StubVector),
            WorkflowTags::default(),
        )
    }

    fn tool_call(name: &str) -> ToolCallRequest {
        ToolCallRequest { name: name.to_string(), arguments: json!({}) }
    }

    #[tokio::test]
    async fn duplicate_tool_calls_charge_budget_once_each() {
        let large = ScriptedModel::new(vec![
            Ok(ModelTurn::ToolCalls {
                calls: vec![tool_call("list_custom_fields"), tool_call("list_custom_fields")],
                thinking: None,
            }),
            ScriptedModel::structured(json!({ "suggested_title": "A" })),
        ]);
        let small = ScriptedModel::new(vec![verdict(true, "")]);
        let tools = registry();
        let engine = ConfirmationEngine {
            large: &large,
            small: &small,
            tools: Some(&tools),
            logger: &None,
        };

        let outcome = engine.run(1, &config(3, true)).await;
        assert!(outcome.confirmed);
        // Both calls charged even though the second was served from cache.
        assert_eq!(outcome.tool_calls, 2);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn exhausted_budget_forces_structured_path() {
        let mut cfg = config(3, true);
        cfg.tool_budget = 2;

        let large = ScriptedModel::new(vec![
            Ok(ModelTurn::ToolCalls {
                calls: vec![tool_call("list_custom_fields"), tool_call("list_custom_fields")],
                thinking: None,
            }),
            ScriptedModel::structured(json!({ "suggested_title": "A" })),
        ]);
        let small = ScriptedModel::new(vec![verdict(true, "")]);
        let tools = registry();
        let engine = ConfirmationEngine {
            large: &large,
            small: &small,
            tools: Some(&tools),
            logger: &None,
        };

        let outcome = engine.run(1, &cfg).await;
        assert!(outcome.confirmed);
        assert_eq!(outcome.tool_calls, 2);
        // First analyze bound tools; the budget ran out, so the second had
        // to go through the structured-output path.
        assert_eq!(large.paths(), vec!["tools", "structured"]);
    }

    #[test]
    fn cache_key_is_order_insensitive() {
        let a: serde_json::Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(cache_key("tool", &a), cache_key("tool", &b));
    }
}
