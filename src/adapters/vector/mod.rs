//! Vector-store client for similar-document search.

pub mod client;

pub use client::{VectorClient, VectorClientConfig};
