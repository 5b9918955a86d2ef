//! HTTP client for the vector store.
//!
//! The store computes embeddings server-side; the core only ships text and
//! attribute payloads. Search is always restricted to fully-processed
//! documents so half-labeled ones never leak into reference context.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ports::{SimilarDocument, VectorRecord, VectorSearch};

const COLLECTION: &str = "documents";

#[derive(Debug, Clone)]
pub struct VectorClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl VectorClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), timeout_secs: 30 }
    }
}

#[derive(Debug, Clone)]
pub struct VectorClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f64,
    payload: HitPayload,
}

#[derive(Deserialize)]
struct HitPayload {
    document_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    correspondent: Option<String>,
    #[serde(default)]
    document_type: Option<String>,
}

impl VectorClient {
    pub fn new(config: VectorClientConfig) -> CoreResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::transport("vector", e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    async fn check(&self, response: reqwest::Response) -> CoreResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::transport("vector", format!("HTTP {status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorSearch for VectorClient {
    async fn search(&self, query: &str, limit: usize) -> CoreResult<Vec<SimilarDocument>> {
        let url = format!("{}/collections/{COLLECTION}/search", self.base_url);
        let body = json!({
            "query": query,
            "limit": limit,
            "filter": { "processed": true }
        });
        let response = self.http.post(&url).json(&body).send().await?;
        let parsed: SearchResponse = self.check(response).await?.json().await?;
        Ok(parsed
            .result
            .into_iter()
            .map(|hit| SimilarDocument {
                document_id: hit.payload.document_id,
                title: hit.payload.title,
                tags: hit.payload.tags,
                correspondent: hit.payload.correspondent,
                document_type: hit.payload.document_type,
                score: hit.score,
            })
            .collect())
    }

    async fn upsert(&self, record: &VectorRecord) -> CoreResult<()> {
        let url = format!("{}/collections/{COLLECTION}/points", self.base_url);
        let body = json!({
            "points": [{
                "id": record.document_id,
                "payload": record,
            }]
        });
        let response = self.http.put(&url).json(&body).send().await?;
        self.check(response).await?;
        Ok(())
    }

    async fn ensure_collection(&self) -> CoreResult<()> {
        let url = format!("{}/collections/{COLLECTION}", self.base_url);
        let response = self.http.put(&url).json(&json!({})).send().await?;
        // Already-exists conflicts are fine.
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        self.check(response).await?;
        Ok(())
    }
}
