//! Scrivener: LLM-driven metadata inference for document management
//! systems.
//!
//! Drives each document of an external DMS through an ordered pipeline of
//! inference steps (OCR, summary, title, correspondent, document type,
//! tags, custom fields). Every step proposes a value with a large model,
//! verifies it with a small one, applies it or queues it for human review,
//! and advances the document's workflow state. That state lives in the
//! DMS's own tag set, so it stays visible and editable there.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::{CoreError, CoreResult};
