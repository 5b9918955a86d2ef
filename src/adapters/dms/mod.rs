//! Typed client for the external document-management service.

pub mod client;
pub mod models;

pub use client::{DmsClient, DmsClientConfig};
