//! Adapters: concrete implementations of the domain ports.

pub mod dms;
pub mod llm;
pub mod sqlite;
pub mod vector;
