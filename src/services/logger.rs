//! Processing logger.
//!
//! Every confirmation-loop event is recorded as a [`LogEntry`] so the UI
//! can replay a document's reasoning as a tree. Writes go through an
//! unbounded channel to a detached writer task: emitters never await the
//! store, and a missing logger is a valid no-op configuration.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::models::{LogEntry, LogEventType, PipelineStep};
use crate::domain::ports::LogRepository;

use super::events::{PipelineEvent, PipelineEventType};

#[derive(Clone)]
pub struct ProcessingLogger {
    tx: mpsc::UnboundedSender<LogEntry>,
    stream: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl ProcessingLogger {
    /// Spawn the writer task and return a cloneable handle.
    pub fn new(repo: Arc<dyn LogRepository>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogEntry>();
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(error) = repo.append(&entry).await {
                    tracing::warn!(%error, document_id = entry.document_id,
                        "failed to persist processing-log entry");
                }
            }
        });
        Self { tx, stream: None }
    }

    /// Forward a subset of events onto a pipeline event stream.
    pub fn with_stream(mut self, stream: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Record one event. Returns the entry id for parent chaining.
    pub fn log(
        &self,
        document_id: i64,
        step: PipelineStep,
        event: LogEventType,
        payload: serde_json::Value,
        parent: Option<Uuid>,
    ) -> Uuid {
        let mut entry = LogEntry::new(document_id, step.as_str(), event, payload.clone());
        if let Some(parent) = parent {
            entry = entry.with_parent(parent);
        }
        let id = entry.id;
        let _ = self.tx.send(entry);

        if let Some(stream) = &self.stream {
            let stream_type = match event {
                LogEventType::Prompt => Some(PipelineEventType::Analyzing),
                LogEventType::Thinking => Some(PipelineEventType::Thinking),
                LogEventType::Confirming => Some(PipelineEventType::Confirming),
                _ => None,
            };
            if let Some(event_type) = stream_type {
                let _ = stream.send(PipelineEvent::new(event_type, Some(step), payload));
            }
        }
        id
    }
}

/// Optional logger handle used throughout the services. `None` drops every
/// event.
pub type LoggerHandle = Option<ProcessingLogger>;

pub fn log_event(
    logger: &LoggerHandle,
    document_id: i64,
    step: PipelineStep,
    event: LogEventType,
    payload: serde_json::Value,
    parent: Option<Uuid>,
) -> Option<Uuid> {
    logger
        .as_ref()
        .map(|l| l.log(document_id, step, event, payload, parent))
}
