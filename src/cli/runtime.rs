//! Runtime wiring: builds adapters and services from the store and the
//! current settings snapshot.
//!
//! HTTP clients are constructed per operation on purpose: endpoints and
//! tokens are runtime settings and may change between calls.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::adapters::dms::{DmsClient, DmsClientConfig};
use crate::adapters::llm::{LlmClient, LlmClientConfig};
use crate::adapters::sqlite::{
    SqliteAnnotationRepository, SqliteBlocklistRepository, SqliteLogRepository,
    SqliteReviewRepository, SqliteSettingsRepository, SqliteTemplateRepository,
};
use crate::adapters::vector::{VectorClient, VectorClientConfig};
use crate::domain::errors::CoreResult;
use crate::domain::models::Settings;
use crate::domain::ports::{
    AnnotationRepository, BlocklistRepository, DocumentStore, LogRepository, ReviewRepository,
};
use crate::services::pipeline::SharedProcessor;
use crate::services::scheduler::ProcessorFactory;
use crate::services::{
    AgentDeps, Pipeline, ProcessingLogger, ReviewService, SettingsService, TemplateStore,
};

#[derive(Clone)]
pub struct AppContext {
    pub settings: SettingsService,
    pub reviews: Arc<dyn ReviewRepository>,
    pub blocklist: Arc<dyn BlocklistRepository>,
    pub annotations: Arc<dyn AnnotationRepository>,
    pub logs: Arc<dyn LogRepository>,
    pub templates: TemplateStore,
}

impl AppContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            settings: SettingsService::new(Arc::new(SqliteSettingsRepository::new(pool.clone()))),
            reviews: Arc::new(SqliteReviewRepository::new(pool.clone())),
            blocklist: Arc::new(SqliteBlocklistRepository::new(pool.clone())),
            annotations: Arc::new(SqliteAnnotationRepository::new(pool.clone())),
            logs: Arc::new(SqliteLogRepository::new(pool.clone())),
            templates: TemplateStore::new(Arc::new(SqliteTemplateRepository::new(pool))),
        }
    }

    pub fn build_dms(&self, settings: &Settings) -> CoreResult<Arc<dyn DocumentStore>> {
        settings.require_dms()?;
        let client = DmsClient::new(DmsClientConfig::new(&settings.dms_url, &settings.dms_token))?;
        Ok(Arc::new(client))
    }

    pub fn build_agent_deps(&self, settings: &Settings) -> CoreResult<AgentDeps> {
        settings.require_llm()?;
        let dms = self.build_dms(settings)?;
        let large =
            LlmClient::new(LlmClientConfig::new(&settings.llm_url, &settings.large_model))?;
        let small =
            LlmClient::new(LlmClientConfig::verifier(&settings.llm_url, &settings.small_model))?;
        let vision =
            LlmClient::new(LlmClientConfig::new(&settings.llm_url, &settings.vision_model))?;
        let vector = VectorClient::new(VectorClientConfig::new(&settings.vector_url))?;

        Ok(AgentDeps {
            dms,
            large: Arc::new(large),
            small: Arc::new(small),
            vision: Arc::new(vision),
            vector: Arc::new(vector),
            reviews: self.reviews.clone(),
            blocklist: self.blocklist.clone(),
            annotations: self.annotations.clone(),
            templates: self.templates.clone(),
            logger: Some(ProcessingLogger::new(self.logs.clone())),
            settings: settings.clone(),
        })
    }

    pub fn build_pipeline(&self, settings: &Settings) -> CoreResult<Pipeline> {
        Ok(Pipeline::new(self.build_agent_deps(settings)?))
    }

    pub fn build_review_service(&self, settings: &Settings) -> CoreResult<ReviewService> {
        Ok(ReviewService::new(
            self.build_dms(settings)?,
            self.reviews.clone(),
            self.blocklist.clone(),
            settings.clone(),
        ))
    }
}

impl ProcessorFactory for AppContext {
    fn build(
        &self,
        settings: &Settings,
    ) -> CoreResult<(Arc<dyn DocumentStore>, SharedProcessor)> {
        let dms = self.build_dms(settings)?;
        let pipeline = self.build_pipeline(settings)?;
        Ok((dms, Arc::new(pipeline)))
    }
}
