//! Chat-completion client for the large, small, and vision models.

pub mod client;

pub use client::{LlmClient, LlmClientConfig};
