//! HTTP client for the DMS REST API.
//!
//! All operations go straight to the wire: nothing is cached, because
//! settings (endpoint, token) may change between calls. 404 maps to
//! `CoreError::NotFound`; every other non-2xx maps to
//! `CoreError::Transport`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{
    CustomField, Document, DocumentFilter, DocumentPatch, EntityKind, NamedEntity, Tag,
};
use crate::domain::ports::DocumentStore;

use super::models::{
    ApiCustomField, ApiDocument, ApiNamedEntity, ApiTag, CreateEntityRequest, PaginatedResponse,
};

/// Page size for paginated reads. Merges walk referring documents in
/// batches of this size to bound memory.
const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct DmsClientConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl DmsClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DmsClient {
    http: Client,
    base_url: String,
    token: String,
}

impl DmsClient {
    pub fn new(config: DmsClientConfig) -> CoreResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::transport("dms", e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Token {}", self.token))
    }

    async fn check(&self, response: reqwest::Response) -> CoreResult<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let url = response.url().path().to_string();
            return Err(CoreError::NotFound(url));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::transport(
                "dms",
                format!("HTTP {status}: {body}"),
            ));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> CoreResult<T> {
        let response = self.auth(self.http.get(url)).send().await?;
        Ok(self.check(response).await?.json::<T>().await?)
    }

    /// Follow `next` links until the listing is exhausted.
    async fn get_all_pages<T: DeserializeOwned>(&self, first_url: String) -> CoreResult<Vec<T>> {
        let mut results = Vec::new();
        let mut url = Some(first_url);
        while let Some(current) = url {
            let page: PaginatedResponse<T> = self.get_json(&current).await?;
            results.extend(page.results);
            url = page.next;
        }
        Ok(results)
    }

    async fn list_documents(&self, query: &str, limit: usize) -> CoreResult<Vec<Document>> {
        let url = self.url(&format!(
            "/api/documents/?{query}&page_size={}",
            limit.min(PAGE_SIZE)
        ));
        let page: PaginatedResponse<ApiDocument> = self.get_json(&url).await?;
        Ok(page.results.into_iter().take(limit).map(Document::from).collect())
    }

    fn entity_path(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Tag => "/api/tags/",
            EntityKind::Correspondent => "/api/correspondents/",
            EntityKind::DocumentType => "/api/document_types/",
        }
    }

    /// Case-insensitive name lookup against one entity collection.
    async fn find_entity_id(&self, kind: EntityKind, name: &str) -> CoreResult<Option<i64>> {
        let url = self.url(&format!(
            "{}?name__iexact={}",
            Self::entity_path(kind),
            urlencode(name)
        ));
        match kind {
            EntityKind::Tag => {
                let page: PaginatedResponse<ApiTag> = self.get_json(&url).await?;
                Ok(page.results.into_iter().next().map(|t| t.id))
            }
            _ => {
                let page: PaginatedResponse<ApiNamedEntity> = self.get_json(&url).await?;
                Ok(page.results.into_iter().next().map(|e| e.id))
            }
        }
    }

    async fn get_or_create_entity(&self, kind: EntityKind, name: &str) -> CoreResult<NamedEntity> {
        let url = self.url(&format!(
            "{}?name__iexact={}",
            Self::entity_path(kind),
            urlencode(name)
        ));
        let page: PaginatedResponse<ApiNamedEntity> = self.get_json(&url).await?;
        if let Some(existing) = page.results.into_iter().next() {
            return Ok(NamedEntity {
                id: existing.id,
                name: existing.name,
                document_count: existing.document_count,
            });
        }
        let response = self
            .auth(self.http.post(self.url(Self::entity_path(kind))))
            .json(&CreateEntityRequest { name })
            .send()
            .await?;
        let created: ApiNamedEntity = self.check(response).await?.json().await?;
        Ok(NamedEntity {
            id: created.id,
            name: created.name,
            document_count: created.document_count,
        })
    }

    async fn tag_id_by_name(&self, name: &str) -> CoreResult<Option<i64>> {
        self.find_entity_id(EntityKind::Tag, name).await
    }

    /// Filter expression for documents referring to an entity.
    fn entity_filter(kind: EntityKind, id: i64) -> String {
        match kind {
            EntityKind::Tag => format!("tags__id={id}"),
            EntityKind::Correspondent => format!("correspondent={id}"),
            EntityKind::DocumentType => format!("document_type={id}"),
        }
    }
}

#[async_trait]
impl DocumentStore for DmsClient {
    async fn get_document(&self, id: i64) -> CoreResult<Document> {
        let api: ApiDocument = self.get_json(&self.url(&format!("/api/documents/{id}/"))).await?;
        Ok(api.into())
    }

    async fn update_document(&self, id: i64, patch: &DocumentPatch) -> CoreResult<Document> {
        let response = self
            .auth(self.http.patch(self.url(&format!("/api/documents/{id}/"))))
            .json(patch)
            .send()
            .await?;
        let api: ApiDocument = self.check(response).await?.json().await?;
        Ok(api.into())
    }

    async fn download_document(&self, id: i64) -> CoreResult<Vec<u8>> {
        let response = self
            .auth(self.http.get(self.url(&format!("/api/documents/{id}/download/"))))
            .send()
            .await?;
        let bytes = self.check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn list_by_tag(&self, tag_name: &str, limit: usize) -> CoreResult<Vec<Document>> {
        let Some(tag_id) = self.tag_id_by_name(tag_name).await? else {
            return Ok(Vec::new());
        };
        self.list_documents(&format!("tags__id={tag_id}"), limit).await
    }

    async fn list_by_tags(&self, tag_names: &[String], limit: usize) -> CoreResult<Vec<Document>> {
        let mut ids = Vec::new();
        for name in tag_names {
            if let Some(id) = self.tag_id_by_name(name).await? {
                ids.push(id.to_string());
            }
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.list_documents(&format!("tags__id__in={}", ids.join(",")), limit).await
    }

    async fn fetch_all_by_filter(&self, filter: &DocumentFilter) -> CoreResult<Vec<Document>> {
        let query = if let Some(name) = &filter.tag_name {
            match self.tag_id_by_name(name).await? {
                Some(id) => format!("tags__id={id}"),
                None => return Ok(Vec::new()),
            }
        } else if let Some(names) = &filter.any_tag_names {
            let mut ids = Vec::new();
            for name in names {
                if let Some(id) = self.tag_id_by_name(name).await? {
                    ids.push(id.to_string());
                }
            }
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            format!("tags__id__in={}", ids.join(","))
        } else if let Some(name) = &filter.correspondent_name {
            match self.find_entity_id(EntityKind::Correspondent, name).await? {
                Some(id) => format!("correspondent={id}"),
                None => return Ok(Vec::new()),
            }
        } else if let Some(name) = &filter.document_type_name {
            match self.find_entity_id(EntityKind::DocumentType, name).await? {
                Some(id) => format!("document_type={id}"),
                None => return Ok(Vec::new()),
            }
        } else {
            String::new()
        };

        let url = self.url(&format!("/api/documents/?{query}&page_size={PAGE_SIZE}"));
        let pages: Vec<ApiDocument> = self.get_all_pages(url).await?;
        let mut documents: Vec<Document> = pages.into_iter().map(Document::from).collect();

        // Custom-field filtering has no server-side query; filter here.
        if let Some((field_name, wanted)) = &filter.custom_field {
            let fields = self.list_custom_fields().await?;
            let Some(field) = fields.iter().find(|f| f.name.eq_ignore_ascii_case(field_name))
            else {
                return Ok(Vec::new());
            };
            documents.retain(|doc| {
                doc.custom_fields.iter().any(|cf| {
                    cf.field == field.id
                        && wanted
                            .as_ref()
                            .map(|w| match &cf.value {
                                serde_json::Value::String(s) => s.eq_ignore_ascii_case(w),
                                other => other.to_string() == *w,
                            })
                            .unwrap_or(true)
                })
            });
        }
        Ok(documents)
    }

    async fn list_tags(&self) -> CoreResult<Vec<Tag>> {
        let url = self.url(&format!("/api/tags/?page_size={PAGE_SIZE}"));
        let tags: Vec<ApiTag> = self.get_all_pages(url).await?;
        Ok(tags
            .into_iter()
            .map(|t| Tag {
                id: t.id,
                name: t.name,
                color: t.color,
                document_count: t.document_count,
            })
            .collect())
    }

    async fn list_correspondents(&self) -> CoreResult<Vec<NamedEntity>> {
        let url = self.url(&format!("/api/correspondents/?page_size={PAGE_SIZE}"));
        let entities: Vec<ApiNamedEntity> = self.get_all_pages(url).await?;
        Ok(entities
            .into_iter()
            .map(|e| NamedEntity { id: e.id, name: e.name, document_count: e.document_count })
            .collect())
    }

    async fn list_document_types(&self) -> CoreResult<Vec<NamedEntity>> {
        let url = self.url(&format!("/api/document_types/?page_size={PAGE_SIZE}"));
        let entities: Vec<ApiNamedEntity> = self.get_all_pages(url).await?;
        Ok(entities
            .into_iter()
            .map(|e| NamedEntity { id: e.id, name: e.name, document_count: e.document_count })
            .collect())
    }

    async fn list_custom_fields(&self) -> CoreResult<Vec<CustomField>> {
        let url = self.url(&format!("/api/custom_fields/?page_size={PAGE_SIZE}"));
        let fields: Vec<ApiCustomField> = self.get_all_pages(url).await?;
        Ok(fields
            .into_iter()
            .map(|f| CustomField { id: f.id, name: f.name, data_type: f.data_type })
            .collect())
    }

    async fn get_or_create_tag(&self, name: &str) -> CoreResult<Tag> {
        let url = self.url(&format!("/api/tags/?name__iexact={}", urlencode(name)));
        let page: PaginatedResponse<ApiTag> = self.get_json(&url).await?;
        if let Some(existing) = page.results.into_iter().next() {
            return Ok(Tag {
                id: existing.id,
                name: existing.name,
                color: existing.color,
                document_count: existing.document_count,
            });
        }
        let response = self
            .auth(self.http.post(self.url("/api/tags/")))
            .json(&CreateEntityRequest { name })
            .send()
            .await?;
        let created: ApiTag = self.check(response).await?.json().await?;
        Ok(Tag {
            id: created.id,
            name: created.name,
            color: created.color,
            document_count: created.document_count,
        })
    }

    async fn get_or_create_correspondent(&self, name: &str) -> CoreResult<NamedEntity> {
        self.get_or_create_entity(EntityKind::Correspondent, name).await
    }

    async fn get_or_create_document_type(&self, name: &str) -> CoreResult<NamedEntity> {
        self.get_or_create_entity(EntityKind::DocumentType, name).await
    }

    async fn add_tag(&self, document_id: i64, tag_name: &str) -> CoreResult<()> {
        let tag = self.get_or_create_tag(tag_name).await?;
        let doc = self.get_document(document_id).await?;
        if doc.has_tag(tag.id) {
            return Ok(());
        }
        let mut tags = doc.tags;
        tags.push(tag.id);
        self.update_document(document_id, &DocumentPatch::tags(tags)).await?;
        Ok(())
    }

    async fn remove_tag(&self, document_id: i64, tag_name: &str) -> CoreResult<()> {
        let Some(tag_id) = self.tag_id_by_name(tag_name).await? else {
            return Ok(());
        };
        let doc = self.get_document(document_id).await?;
        if !doc.has_tag(tag_id) {
            return Ok(());
        }
        let tags: Vec<i64> = doc.tags.into_iter().filter(|t| *t != tag_id).collect();
        self.update_document(document_id, &DocumentPatch::tags(tags)).await?;
        Ok(())
    }

    async fn transition_tag(&self, document_id: i64, from: &str, to: &str) -> CoreResult<()> {
        let to_tag = self.get_or_create_tag(to).await?;
        let from_id = self.tag_id_by_name(from).await?;
        let doc = self.get_document(document_id).await?;

        let already_there = doc.has_tag(to_tag.id)
            && from_id.map(|id| !doc.has_tag(id)).unwrap_or(true);
        if already_there {
            return Ok(());
        }

        let mut tags: Vec<i64> = doc
            .tags
            .into_iter()
            .filter(|t| Some(*t) != from_id)
            .collect();
        if !tags.contains(&to_tag.id) {
            tags.push(to_tag.id);
        }
        self.update_document(document_id, &DocumentPatch::tags(tags)).await?;
        Ok(())
    }

    async fn merge_entities(
        &self,
        kind: EntityKind,
        source_id: i64,
        target_id: i64,
    ) -> CoreResult<usize> {
        let url = self.url(&format!(
            "/api/documents/?{}&page_size={PAGE_SIZE}",
            Self::entity_filter(kind, source_id)
        ));
        let referring: Vec<ApiDocument> = self.get_all_pages(url).await?;
        let moved = referring.len();

        for doc in referring {
            let patch = match kind {
                EntityKind::Correspondent => DocumentPatch {
                    correspondent: Some(Some(target_id)),
                    ..Default::default()
                },
                EntityKind::DocumentType => DocumentPatch {
                    document_type: Some(Some(target_id)),
                    ..Default::default()
                },
                EntityKind::Tag => {
                    let mut tags: Vec<i64> =
                        doc.tags.iter().copied().filter(|t| *t != source_id).collect();
                    if !tags.contains(&target_id) {
                        tags.push(target_id);
                    }
                    DocumentPatch::tags(tags)
                }
            };
            self.update_document(doc.id, &patch).await?;
        }

        self.delete_entity(kind, source_id).await?;
        Ok(moved)
    }

    async fn delete_entity(&self, kind: EntityKind, id: i64) -> CoreResult<()> {
        let url = self.url(&format!("{}{id}/", Self::entity_path(kind)));
        let response = self.auth(self.http.delete(&url)).send().await?;
        self.check(response).await?;
        Ok(())
    }

    async fn set_tag_color(&self, tag_id: i64, color: &str) -> CoreResult<()> {
        let response = self
            .auth(self.http.patch(self.url(&format!("/api/tags/{tag_id}/"))))
            .json(&serde_json::json!({ "color": color }))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn count_by_tag(&self, tag_name: &str) -> CoreResult<usize> {
        let Some(tag_id) = self.tag_id_by_name(tag_name).await? else {
            return Ok(0);
        };
        let url = self.url(&format!("/api/documents/?tags__id={tag_id}&page_size=1"));
        let page: PaginatedResponse<ApiDocument> = self.get_json(&url).await?;
        Ok(page.count)
    }
}

/// Percent-encode a query value. Only the characters that matter for the
/// DMS name lookups.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push_str("%20"),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
