//! Port for the persisted settings key/value table.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::errors::CoreResult;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Every persisted override.
    async fn load_all(&self) -> CoreResult<BTreeMap<String, String>>;

    async fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    async fn remove(&self, key: &str) -> CoreResult<()>;
}
