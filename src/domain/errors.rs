//! Core errors for the scrivener processing pipeline.

use thiserror::Error;

/// Errors surfaced by the document processing core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// DMS, LLM, or vector store unreachable, auth failure, or 5xx.
    #[error("Transport error ({service}): {message}")]
    Transport { service: String, message: String },

    /// DMS returned 404 for a resource lookup.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Structured-output parse failure, schema violation, or empty analysis.
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// Confirmation model failure.
    #[error("Confirmation failed: {0}")]
    Confirmation(String),

    /// Tool invocation failure.
    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    /// Missing or invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background job in an invalid state.
    #[error("Job error: {0}")]
    Job(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Transport { service: service.into(), message: message.into() }
    }

    /// Whether this error came from the network edge rather than model output.
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Transport { .. })
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        let service = err.url().map(|u| u.host_str().unwrap_or("http").to_string());
        CoreError::Transport {
            service: service.unwrap_or_else(|| "http".to_string()),
            message: err.to_string(),
        }
    }
}
