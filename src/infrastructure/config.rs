//! Process bootstrap configuration.
//!
//! Only what the binary needs before the store is open: database path and
//! log level. Everything else is a runtime setting in the store itself
//! (see `domain::models::Settings`) and is re-read per operation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Path of the core's SQLite store.
    pub database_path: String,
    /// Default log filter, overridable with `RUST_LOG`.
    pub log_level: String,
    /// Emit logs as JSON instead of human-readable lines.
    pub log_json: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            database_path: ".scrivener/scrivener.db".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl BootstrapConfig {
    /// Load with hierarchical merging: defaults, then `scrivener.yaml` in
    /// the working directory, then `SCRIVENER_*` environment variables.
    pub fn load() -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(BootstrapConfig::default()))
            .merge(Yaml::file("scrivener.yaml"))
            .merge(Env::prefixed("SCRIVENER_"))
            .extract()
            .context("Failed to extract bootstrap configuration")
    }

    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.database_path)
    }
}
