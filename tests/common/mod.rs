//! Shared test fixtures: an in-memory DMS, scripted language models, and
//! an in-memory SQLite store with migrations applied.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use scrivener::adapters::sqlite::{embedded_migrations, Migrator};
use scrivener::domain::errors::{CoreError, CoreResult};
use scrivener::domain::models::{
    CustomField, Document, DocumentFilter, DocumentPatch, EntityKind, NamedEntity, Settings, Tag,
};
use scrivener::domain::ports::{
    ChatMessage, ChatResponse, DocumentStore, GenerateOptions, LanguageModel, ModelTurn,
    SimilarDocument, ToolSpec, VectorRecord, VectorSearch, VisionModel,
};

pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("failed to create test database");
    Migrator::new(pool.clone())
        .run_embedded_migrations(embedded_migrations())
        .await
        .expect("failed to run migrations");
    pool
}

/// Settings profile used by most pipeline tests: everything enabled
/// except OCR (content is pre-populated), summary, and custom fields.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.llm_url = "http://llm.test".to_string();
    settings.dms_url = "http://dms.test".to_string();
    settings.steps.ocr = false;
    settings.steps.summary = false;
    settings.steps.custom_fields = false;
    settings.max_retries = 3;
    settings
}

#[derive(Default)]
struct DmsState {
    documents: HashMap<i64, Document>,
    tags: HashMap<i64, Tag>,
    correspondents: HashMap<i64, NamedEntity>,
    document_types: HashMap<i64, NamedEntity>,
    custom_fields: Vec<CustomField>,
    next_id: i64,
    update_calls: usize,
}

/// In-memory stand-in for the DMS with the same observable semantics as
/// the HTTP adapter: case-insensitive name lookups, idempotent tag
/// operations, single-write transitions.
pub struct FakeDms {
    state: Mutex<DmsState>,
}

impl FakeDms {
    pub fn new() -> Self {
        Self { state: Mutex::new(DmsState { next_id: 1000, ..Default::default() }) }
    }

    pub fn insert_document(&self, document: Document) {
        self.state.lock().unwrap().documents.insert(document.id, document);
    }

    pub fn insert_tag(&self, id: i64, name: &str) {
        self.state.lock().unwrap().tags.insert(
            id,
            Tag { id, name: name.to_string(), color: None, document_count: 0 },
        );
    }

    pub fn insert_correspondent(&self, id: i64, name: &str, count: i64) {
        self.state.lock().unwrap().correspondents.insert(
            id,
            NamedEntity { id, name: name.to_string(), document_count: count },
        );
    }

    pub fn insert_document_type(&self, id: i64, name: &str, count: i64) {
        self.state.lock().unwrap().document_types.insert(
            id,
            NamedEntity { id, name: name.to_string(), document_count: count },
        );
    }

    pub fn insert_custom_field(&self, id: i64, name: &str) {
        self.state.lock().unwrap().custom_fields.push(CustomField {
            id,
            name: name.to_string(),
            data_type: "string".to_string(),
        });
    }

    /// Tag names currently on a document, for assertions.
    pub fn document_tag_names(&self, document_id: i64) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let doc = state.documents.get(&document_id).expect("unknown document");
        doc.tags
            .iter()
            .filter_map(|id| state.tags.get(id).map(|t| t.name.clone()))
            .collect()
    }

    pub fn document(&self, document_id: i64) -> Document {
        self.state.lock().unwrap().documents.get(&document_id).expect("unknown document").clone()
    }

    pub fn update_calls(&self) -> usize {
        self.state.lock().unwrap().update_calls
    }

    pub fn correspondent_exists(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .correspondents
            .values()
            .any(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn tag_id_by_name(state: &DmsState, name: &str) -> Option<i64> {
        state
            .tags
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .map(|t| t.id)
    }
}

#[async_trait]
impl DocumentStore for FakeDms {
    async fn get_document(&self, id: i64) -> CoreResult<Document> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("document {id}")))
    }

    async fn update_document(&self, id: i64, patch: &DocumentPatch) -> CoreResult<Document> {
        let mut state = self.state.lock().unwrap();
        state.update_calls += 1;
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("document {id}")))?;
        if let Some(title) = &patch.title {
            doc.title = title.clone();
        }
        if let Some(correspondent) = &patch.correspondent {
            doc.correspondent = *correspondent;
        }
        if let Some(document_type) = &patch.document_type {
            doc.document_type = *document_type;
        }
        if let Some(tags) = &patch.tags {
            doc.tags = tags.clone();
        }
        if let Some(custom_fields) = &patch.custom_fields {
            doc.custom_fields = custom_fields.clone();
        }
        if let Some(content) = &patch.content {
            doc.content = content.clone();
        }
        Ok(doc.clone())
    }

    async fn download_document(&self, _id: i64) -> CoreResult<Vec<u8>> {
        Ok(b"%PDF-1.4 test".to_vec())
    }

    async fn list_by_tag(&self, tag_name: &str, limit: usize) -> CoreResult<Vec<Document>> {
        let state = self.state.lock().unwrap();
        let Some(tag_id) = Self::tag_id_by_name(&state, tag_name) else {
            return Ok(Vec::new());
        };
        let mut docs: Vec<Document> = state
            .documents
            .values()
            .filter(|d| d.tags.contains(&tag_id))
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.id);
        docs.truncate(limit);
        Ok(docs)
    }

    async fn list_by_tags(&self, tag_names: &[String], limit: usize) -> CoreResult<Vec<Document>> {
        let state = self.state.lock().unwrap();
        let ids: Vec<i64> = tag_names
            .iter()
            .filter_map(|n| Self::tag_id_by_name(&state, n))
            .collect();
        let mut docs: Vec<Document> = state
            .documents
            .values()
            .filter(|d| d.tags.iter().any(|t| ids.contains(t)))
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.id);
        docs.truncate(limit);
        Ok(docs)
    }

    async fn fetch_all_by_filter(&self, filter: &DocumentFilter) -> CoreResult<Vec<Document>> {
        if let Some(tag) = &filter.tag_name {
            return self.list_by_tag(tag, usize::MAX).await;
        }
        let state = self.state.lock().unwrap();
        let mut docs: Vec<Document> = state.documents.values().cloned().collect();
        if let Some(name) = &filter.correspondent_name {
            let id = state
                .correspondents
                .values()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .map(|c| c.id);
            docs.retain(|d| d.correspondent == id && id.is_some());
        }
        if let Some(name) = &filter.document_type_name {
            let id = state
                .document_types
                .values()
                .find(|t| t.name.eq_ignore_ascii_case(name))
                .map(|t| t.id);
            docs.retain(|d| d.document_type == id && id.is_some());
        }
        docs.sort_by_key(|d| d.id);
        Ok(docs)
    }

    async fn list_tags(&self) -> CoreResult<Vec<Tag>> {
        let state = self.state.lock().unwrap();
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        for tag in &mut tags {
            tag.document_count = state
                .documents
                .values()
                .filter(|d| d.tags.contains(&tag.id))
                .count() as i64;
        }
        tags.sort_by_key(|t| t.id);
        Ok(tags)
    }

    async fn list_correspondents(&self) -> CoreResult<Vec<NamedEntity>> {
        let state = self.state.lock().unwrap();
        let mut entities: Vec<NamedEntity> = state.correspondents.values().cloned().collect();
        entities.sort_by_key(|e| e.id);
        Ok(entities)
    }

    async fn list_document_types(&self) -> CoreResult<Vec<NamedEntity>> {
        let state = self.state.lock().unwrap();
        let mut entities: Vec<NamedEntity> = state.document_types.values().cloned().collect();
        entities.sort_by_key(|e| e.id);
        Ok(entities)
    }

    async fn list_custom_fields(&self) -> CoreResult<Vec<CustomField>> {
        Ok(self.state.lock().unwrap().custom_fields.clone())
    }

    async fn get_or_create_tag(&self, name: &str) -> CoreResult<Tag> {
        let mut state = self.state.lock().unwrap();
        if let Some(tag) = state.tags.values().find(|t| t.name.eq_ignore_ascii_case(name)) {
            return Ok(tag.clone());
        }
        state.next_id += 1;
        let tag = Tag {
            id: state.next_id,
            name: name.to_string(),
            color: None,
            document_count: 0,
        };
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn get_or_create_correspondent(&self, name: &str) -> CoreResult<NamedEntity> {
        let mut state = self.state.lock().unwrap();
        if let Some(entity) =
            state.correspondents.values().find(|c| c.name.eq_ignore_ascii_case(name))
        {
            return Ok(entity.clone());
        }
        state.next_id += 1;
        let entity =
            NamedEntity { id: state.next_id, name: name.to_string(), document_count: 0 };
        state.correspondents.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn get_or_create_document_type(&self, name: &str) -> CoreResult<NamedEntity> {
        let mut state = self.state.lock().unwrap();
        if let Some(entity) =
            state.document_types.values().find(|t| t.name.eq_ignore_ascii_case(name))
        {
            return Ok(entity.clone());
        }
        state.next_id += 1;
        let entity =
            NamedEntity { id: state.next_id, name: name.to_string(), document_count: 0 };
        state.document_types.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn add_tag(&self, document_id: i64, tag_name: &str) -> CoreResult<()> {
        let tag = self.get_or_create_tag(tag_name).await?;
        let mut state = self.state.lock().unwrap();
        let doc = state
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| CoreError::NotFound(format!("document {document_id}")))?;
        if !doc.tags.contains(&tag.id) {
            doc.tags.push(tag.id);
        }
        Ok(())
    }

    async fn remove_tag(&self, document_id: i64, tag_name: &str) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let Some(tag_id) = Self::tag_id_by_name(&state, tag_name) else {
            return Ok(());
        };
        let doc = state
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| CoreError::NotFound(format!("document {document_id}")))?;
        doc.tags.retain(|t| *t != tag_id);
        Ok(())
    }

    async fn transition_tag(&self, document_id: i64, from: &str, to: &str) -> CoreResult<()> {
        let to_tag = self.get_or_create_tag(to).await?;
        let mut state = self.state.lock().unwrap();
        let from_id = Self::tag_id_by_name(&state, from);
        let doc = state
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| CoreError::NotFound(format!("document {document_id}")))?;
        let already_there =
            doc.tags.contains(&to_tag.id) && from_id.map(|id| !doc.tags.contains(&id)).unwrap_or(true);
        if already_there {
            return Ok(());
        }
        if let Some(from_id) = from_id {
            doc.tags.retain(|t| *t != from_id);
        }
        if !doc.tags.contains(&to_tag.id) {
            doc.tags.push(to_tag.id);
        }
        Ok(())
    }

    async fn merge_entities(
        &self,
        kind: EntityKind,
        source_id: i64,
        target_id: i64,
    ) -> CoreResult<usize> {
        let mut state = self.state.lock().unwrap();
        let mut moved = 0;
        for doc in state.documents.values_mut() {
            match kind {
                EntityKind::Correspondent if doc.correspondent == Some(source_id) => {
                    doc.correspondent = Some(target_id);
                    moved += 1;
                }
                EntityKind::DocumentType if doc.document_type == Some(source_id) => {
                    doc.document_type = Some(target_id);
                    moved += 1;
                }
                EntityKind::Tag if doc.tags.contains(&source_id) => {
                    doc.tags.retain(|t| *t != source_id);
                    if !doc.tags.contains(&target_id) {
                        doc.tags.push(target_id);
                    }
                    moved += 1;
                }
                _ => {}
            }
        }
        match kind {
            EntityKind::Tag => {
                state.tags.remove(&source_id);
            }
            EntityKind::Correspondent => {
                state.correspondents.remove(&source_id);
            }
            EntityKind::DocumentType => {
                state.document_types.remove(&source_id);
            }
        }
        Ok(moved)
    }

    async fn delete_entity(&self, kind: EntityKind, id: i64) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        match kind {
            EntityKind::Tag => state.tags.remove(&id).map(|_| ()),
            EntityKind::Correspondent => state.correspondents.remove(&id).map(|_| ()),
            EntityKind::DocumentType => state.document_types.remove(&id).map(|_| ()),
        }
        .ok_or_else(|| CoreError::NotFound(format!("{kind} {id}")))
    }

    async fn set_tag_color(&self, tag_id: i64, color: &str) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let tag = state
            .tags
            .get_mut(&tag_id)
            .ok_or_else(|| CoreError::NotFound(format!("tag {tag_id}")))?;
        tag.color = Some(color.to_string());
        Ok(())
    }

    async fn count_by_tag(&self, tag_name: &str) -> CoreResult<usize> {
        Ok(self.list_by_tag(tag_name, usize::MAX).await?.len())
    }
}

/// Language model replaying a scripted sequence of turns, shared between
/// the structured and tool-bound entry points. An optional fallback value
/// answers every call once the script is exhausted.
pub struct ScriptedLlm {
    turns: Mutex<Vec<CoreResult<ModelTurn>>>,
    fallback: Option<serde_json::Value>,
}

impl ScriptedLlm {
    pub fn new(turns: Vec<CoreResult<ModelTurn>>) -> Self {
        Self { turns: Mutex::new(turns), fallback: None }
    }

    /// Model that always answers with the same structured value.
    pub fn always(value: serde_json::Value) -> Self {
        Self { turns: Mutex::new(Vec::new()), fallback: Some(value) }
    }

    pub fn structured(value: serde_json::Value) -> CoreResult<ModelTurn> {
        Ok(ModelTurn::Structured { value, thinking: None })
    }

    fn next(&self) -> CoreResult<ModelTurn> {
        let mut turns = self.turns.lock().unwrap();
        if turns.is_empty() {
            if let Some(value) = &self.fallback {
                return Ok(ModelTurn::Structured { value: value.clone(), thinking: None });
            }
            return Err(CoreError::Analysis("scripted model ran out of turns".to_string()));
        }
        turns.remove(0)
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerateOptions,
    ) -> CoreResult<ChatResponse> {
        Ok(ChatResponse { content: String::new(), thinking: None })
    }

    async fn generate_structured(
        &self,
        _messages: &[ChatMessage],
        _schema: &serde_json::Value,
    ) -> CoreResult<(serde_json::Value, Option<String>)> {
        match self.next()? {
            ModelTurn::Structured { value, thinking } => Ok((value, thinking)),
            ModelTurn::ToolCalls { .. } => {
                Err(CoreError::Analysis("unexpected tool call".to_string()))
            }
        }
    }

    async fn generate_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolSpec],
        _schema: &serde_json::Value,
    ) -> CoreResult<ModelTurn> {
        self.next()
    }
}

/// Confirmation model that always approves.
pub struct AlwaysConfirm;

#[async_trait]
impl LanguageModel for AlwaysConfirm {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerateOptions,
    ) -> CoreResult<ChatResponse> {
        Ok(ChatResponse { content: String::new(), thinking: None })
    }

    async fn generate_structured(
        &self,
        _messages: &[ChatMessage],
        _schema: &serde_json::Value,
    ) -> CoreResult<(serde_json::Value, Option<String>)> {
        Ok((json!({ "confirmed": true, "feedback": "", "suggested_changes": "" }), None))
    }

    async fn generate_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolSpec],
        _schema: &serde_json::Value,
    ) -> CoreResult<ModelTurn> {
        Ok(ModelTurn::Structured {
            value: json!({ "confirmed": true }),
            thinking: None,
        })
    }
}

/// Vision model returning fixed text.
pub struct FixedVision(pub &'static str);

#[async_trait]
impl VisionModel for FixedVision {
    async fn extract_text(&self, _document_bytes: &[u8]) -> CoreResult<String> {
        Ok(self.0.to_string())
    }
}

/// Vector store with no content.
pub struct EmptyVector;

#[async_trait]
impl VectorSearch for EmptyVector {
    async fn search(&self, _query: &str, _limit: usize) -> CoreResult<Vec<SimilarDocument>> {
        Ok(Vec::new())
    }
    async fn upsert(&self, _record: &VectorRecord) -> CoreResult<()> {
        Ok(())
    }
    async fn ensure_collection(&self) -> CoreResult<()> {
        Ok(())
    }
}

/// Build the agent dependency bundle over the fakes and an in-memory
/// store.
pub async fn build_deps(
    dms: Arc<FakeDms>,
    large: Arc<dyn LanguageModel>,
    small: Arc<dyn LanguageModel>,
    settings: Settings,
    pool: &SqlitePool,
) -> scrivener::services::AgentDeps {
    use scrivener::adapters::sqlite::{
        SqliteAnnotationRepository, SqliteBlocklistRepository, SqliteReviewRepository,
        SqliteTemplateRepository,
    };
    use scrivener::services::TemplateStore;

    scrivener::services::AgentDeps {
        dms,
        large,
        small,
        vision: Arc::new(FixedVision("extracted text")),
        vector: Arc::new(EmptyVector),
        reviews: Arc::new(SqliteReviewRepository::new(pool.clone())),
        blocklist: Arc::new(SqliteBlocklistRepository::new(pool.clone())),
        annotations: Arc::new(SqliteAnnotationRepository::new(pool.clone())),
        templates: TemplateStore::new(Arc::new(SqliteTemplateRepository::new(pool.clone()))),
        logger: None,
        settings,
    }
}
