//! Runtime-mutable settings.
//!
//! Settings live in the core's key/value store and are re-read at the start
//! of every operation. Caching any of these is a correctness bug: the user
//! may retune endpoints, intervals, or step flags at any time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::workflow::WorkflowTags;
use crate::domain::errors::{CoreError, CoreResult};

/// Per-step enable flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFlags {
    pub ocr: bool,
    pub summary: bool,
    pub title: bool,
    pub correspondent: bool,
    pub document_type: bool,
    pub tags: bool,
    pub custom_fields: bool,
}

impl Default for StepFlags {
    fn default() -> Self {
        Self {
            ocr: true,
            summary: false,
            title: true,
            correspondent: true,
            document_type: true,
            tags: true,
            custom_fields: true,
        }
    }
}

/// Process-wide configuration, persisted as key/value rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// LLM endpoint base URL (chat-completion style API).
    pub llm_url: String,
    /// Reasoning model used for analysis and tool use.
    pub large_model: String,
    /// Verifier model used for binary confirmation.
    pub small_model: String,
    /// Vision model used for OCR re-extraction.
    pub vision_model: String,
    /// Model used for prompt translation, when configured.
    pub translation_model: String,

    pub dms_url: String,
    pub dms_token: String,
    pub vector_url: String,

    pub workflow: WorkflowTags,
    pub steps: StepFlags,

    pub auto_enabled: bool,
    /// Poll interval of the auto-processing loop, in minutes.
    pub interval_minutes: u64,
    /// Max confirmation attempts before a step is queued for review.
    pub max_retries: u32,
    /// Tool-call budget per document run.
    pub tool_budget: u32,
    /// Language code selecting the prompt template set.
    pub prompt_language: String,
    /// Minimum content length below which OCR is considered missing.
    pub ocr_min_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_url: String::new(),
            large_model: "qwen3:14b".to_string(),
            small_model: "qwen3:4b".to_string(),
            vision_model: "llama3.2-vision".to_string(),
            translation_model: String::new(),
            dms_url: String::new(),
            dms_token: String::new(),
            vector_url: String::new(),
            workflow: WorkflowTags::default(),
            steps: StepFlags::default(),
            auto_enabled: false,
            interval_minutes: 5,
            max_retries: 3,
            tool_budget: 5,
            prompt_language: "en".to_string(),
            ocr_min_chars: 50,
        }
    }
}

impl Settings {
    /// Fail early when a call path needs the LLM and none is configured.
    pub fn require_llm(&self) -> CoreResult<()> {
        if self.llm_url.trim().is_empty() {
            return Err(CoreError::Config("no LLM endpoint configured".to_string()));
        }
        Ok(())
    }

    pub fn require_dms(&self) -> CoreResult<()> {
        if self.dms_url.trim().is_empty() {
            return Err(CoreError::Config("no DMS endpoint configured".to_string()));
        }
        Ok(())
    }

    /// Flatten to key/value rows for the settings table. Nested sections use
    /// dotted keys (`workflow.pending`, `steps.title`).
    pub fn to_map(&self) -> CoreResult<BTreeMap<String, String>> {
        let value = serde_json::to_value(self)?;
        let mut map = BTreeMap::new();
        flatten("", &value, &mut map);
        Ok(map)
    }

    /// Rebuild from key/value rows, falling back to defaults for missing
    /// keys. Unknown keys are rejected so typos surface instead of rotting.
    pub fn from_map(rows: &BTreeMap<String, String>) -> CoreResult<Self> {
        let mut value = serde_json::to_value(Settings::default())?;
        for (key, raw) in rows {
            let slot = lookup_mut(&mut value, key)
                .ok_or_else(|| CoreError::Config(format!("unknown setting '{key}'")))?;
            *slot = parse_scalar(&*slot, raw, key)?;
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Apply one update, validating the key and value shape.
    pub fn set(&mut self, key: &str, raw: &str) -> CoreResult<()> {
        let mut value = serde_json::to_value(&*self)?;
        let slot = lookup_mut(&mut value, key)
            .ok_or_else(|| CoreError::Config(format!("unknown setting '{key}'")))?;
        *slot = parse_scalar(&*slot, raw, key)?;
        *self = serde_json::from_value(value)?;
        Ok(())
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                flatten(&key, v, out);
            }
        }
        serde_json::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

fn lookup_mut<'a>(
    value: &'a mut serde_json::Value,
    dotted: &str,
) -> Option<&'a mut serde_json::Value> {
    let mut current = value;
    for part in dotted.split('.') {
        current = current.as_object_mut()?.get_mut(part)?;
    }
    Some(current)
}

/// Parse a raw string against the type of the slot it replaces.
fn parse_scalar(
    slot: &serde_json::Value,
    raw: &str,
    key: &str,
) -> CoreResult<serde_json::Value> {
    let parsed = match slot {
        serde_json::Value::String(_) => serde_json::Value::String(raw.to_string()),
        serde_json::Value::Bool(_) => serde_json::Value::Bool(
            raw.parse::<bool>()
                .map_err(|_| CoreError::Config(format!("setting '{key}' expects true/false")))?,
        ),
        serde_json::Value::Number(_) => raw
            .parse::<i64>()
            .map(serde_json::Value::from)
            .map_err(|_| CoreError::Config(format!("setting '{key}' expects a number")))?,
        _ => {
            return Err(CoreError::Config(format!("setting '{key}' is not a scalar")));
        }
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_map() {
        let mut settings = Settings::default();
        settings.llm_url = "http://localhost:11434".to_string();
        settings.steps.summary = true;
        settings.interval_minutes = 15;

        let map = settings.to_map().unwrap();
        let restored = Settings::from_map(&map).unwrap();
        assert_eq!(restored, settings);
    }

    #[test]
    fn set_validates_types() {
        let mut settings = Settings::default();
        settings.set("interval_minutes", "10").unwrap();
        assert_eq!(settings.interval_minutes, 10);

        settings.set("steps.title", "false").unwrap();
        assert!(!settings.steps.title);

        assert!(settings.set("interval_minutes", "soon").is_err());
        assert!(settings.set("no_such_key", "1").is_err());
    }

    #[test]
    fn partial_map_falls_back_to_defaults() {
        let mut rows = BTreeMap::new();
        rows.insert("dms_url".to_string(), "http://dms:8000".to_string());
        let settings = Settings::from_map(&rows).unwrap();
        assert_eq!(settings.dms_url, "http://dms:8000");
        assert_eq!(settings.max_retries, Settings::default().max_retries);
    }
}
