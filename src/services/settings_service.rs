//! Runtime settings service.
//!
//! Thin typed layer over the key/value table. Every consumer calls
//! `load()` at the start of its operation; nothing here caches.

use std::sync::Arc;

use crate::domain::errors::CoreResult;
use crate::domain::models::Settings;
use crate::domain::ports::SettingsRepository;

#[derive(Clone)]
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Current settings: defaults overlaid with every persisted row.
    /// Rows that no longer map to a known key (left over from older
    /// versions) are skipped with a warning instead of poisoning the load.
    pub async fn load(&self) -> CoreResult<Settings> {
        let rows = self.repo.load_all().await?;
        let mut settings = Settings::default();
        for (key, value) in &rows {
            if let Err(error) = settings.set(key, value) {
                tracing::warn!(%error, key, "ignoring unrecognized setting row");
            }
        }
        Ok(settings)
    }

    /// Validate and persist one update. Returns the resulting settings.
    pub async fn update(&self, key: &str, value: &str) -> CoreResult<Settings> {
        let mut settings = self.load().await?;
        settings.set(key, value)?;
        self.repo.set(key, value).await?;
        Ok(settings)
    }

    /// Drop a persisted override, reverting the key to its default.
    pub async fn reset(&self, key: &str) -> CoreResult<()> {
        self.repo.remove(key).await
    }
}
