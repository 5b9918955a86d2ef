//! Stream events emitted by the pipeline's streaming path.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::PipelineStep;

/// One event on the `process_document_stream` channel.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    #[serde(rename = "type")]
    pub event_type: PipelineEventType,
    pub step: Option<PipelineStep>,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEventType {
    PipelineStart,
    StepStart,
    Analyzing,
    Thinking,
    Confirming,
    StepComplete,
    StepError,
    NeedsReview,
    PipelineComplete,
}

impl PipelineEvent {
    pub fn new(
        event_type: PipelineEventType,
        step: Option<PipelineStep>,
        data: serde_json::Value,
    ) -> Self {
        Self { event_type, step, data, timestamp: Utc::now() }
    }
}
