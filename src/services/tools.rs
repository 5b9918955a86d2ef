//! Read-only tools bound to the analysis model.
//!
//! Every tool renders to a plain string intended for re-ingestion into the
//! model's prompt, and every listing is restricted to fully-processed
//! documents so in-flight ones never become reference material.

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{Document, DocumentFilter, WorkflowTags};
use crate::domain::ports::{DocumentStore, ToolSpec, VectorSearch};

/// Hard cap on listing sizes regardless of what the model asks for.
const MAX_LIMIT: usize = 10;

pub struct ToolRegistry {
    dms: Arc<dyn DocumentStore>,
    vector: Arc<dyn VectorSearch>,
    workflow: WorkflowTags,
}

impl ToolRegistry {
    pub fn new(
        dms: Arc<dyn DocumentStore>,
        vector: Arc<dyn VectorSearch>,
        workflow: WorkflowTags,
    ) -> Self {
        Self { dms, vector, workflow }
    }

    /// Declarations for every tool, in a stable order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        fn limit_property() -> serde_json::Value {
            json!({ "type": "integer", "minimum": 1, "maximum": MAX_LIMIT })
        }
        vec![
            ToolSpec {
                name: "search_similar_documents".to_string(),
                description: "Search processed reference documents by content similarity. \
                              Returns titles, tags, correspondent and type with scores."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "limit": limit_property()
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: "get_document".to_string(),
                description: "Look up one processed document by id.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": { "doc_id": { "type": "integer" } },
                    "required": ["doc_id"]
                }),
            },
            ToolSpec {
                name: "get_documents_by_tag".to_string(),
                description: "List processed documents carrying a tag.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "limit": limit_property()
                    },
                    "required": ["name"]
                }),
            },
            ToolSpec {
                name: "get_documents_by_correspondent".to_string(),
                description: "List processed documents of a correspondent.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "limit": limit_property()
                    },
                    "required": ["name"]
                }),
            },
            ToolSpec {
                name: "get_documents_by_type".to_string(),
                description: "List processed documents of a document type.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "limit": limit_property()
                    },
                    "required": ["name"]
                }),
            },
            ToolSpec {
                name: "get_documents_by_custom_field".to_string(),
                description: "List processed documents carrying a custom field, optionally \
                              matching a value."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "value": { "type": "string" },
                        "limit": limit_property()
                    },
                    "required": ["name"]
                }),
            },
            ToolSpec {
                name: "list_custom_fields".to_string(),
                description: "Enumerate the custom fields defined in the document system."
                    .to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
        ]
    }

    /// Invoke a tool by name. Unknown names and argument problems surface
    /// as `CoreError::Tool` so the engine can feed them back to the model.
    pub async fn invoke(&self, name: &str, args: &serde_json::Value) -> CoreResult<String> {
        match name {
            "search_similar_documents" => self.search_similar(args).await,
            "get_document" => self.get_document(args).await,
            "get_documents_by_tag" => {
                let tag = string_arg(name, args, "name")?;
                let filter = DocumentFilter { tag_name: Some(tag), ..Default::default() };
                self.filtered_listing(name, args, filter).await
            }
            "get_documents_by_correspondent" => {
                let correspondent = string_arg(name, args, "name")?;
                let filter = DocumentFilter {
                    correspondent_name: Some(correspondent),
                    ..Default::default()
                };
                self.filtered_listing(name, args, filter).await
            }
            "get_documents_by_type" => {
                let doc_type = string_arg(name, args, "name")?;
                let filter = DocumentFilter {
                    document_type_name: Some(doc_type),
                    ..Default::default()
                };
                self.filtered_listing(name, args, filter).await
            }
            "get_documents_by_custom_field" => {
                let field = string_arg(name, args, "name")?;
                let value = args.get("value").and_then(|v| v.as_str()).map(String::from);
                let filter = DocumentFilter {
                    custom_field: Some((field, value)),
                    ..Default::default()
                };
                self.filtered_listing(name, args, filter).await
            }
            "list_custom_fields" => self.list_custom_fields().await,
            other => Err(CoreError::Tool {
                tool: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        }
    }

    async fn search_similar(&self, args: &serde_json::Value) -> CoreResult<String> {
        let query = string_arg("search_similar_documents", args, "query")?;
        let limit = limit_arg(args);
        let hits = self
            .vector
            .search(&query, limit)
            .await
            .map_err(|e| CoreError::Tool {
                tool: "search_similar_documents".to_string(),
                message: e.to_string(),
            })?;
        if hits.is_empty() {
            return Ok("No similar documents found.".to_string());
        }
        let lines: Vec<String> = hits
            .iter()
            .map(|hit| {
                format!(
                    "- \"{}\" (score {:.2}) correspondent={} type={} tags=[{}]",
                    hit.title,
                    hit.score,
                    hit.correspondent.as_deref().unwrap_or("-"),
                    hit.document_type.as_deref().unwrap_or("-"),
                    hit.tags.join(", ")
                )
            })
            .collect();
        Ok(format!("Similar documents:\n{}", lines.join("\n")))
    }

    async fn get_document(&self, args: &serde_json::Value) -> CoreResult<String> {
        let doc_id = args
            .get("doc_id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| CoreError::Tool {
                tool: "get_document".to_string(),
                message: "missing integer argument 'doc_id'".to_string(),
            })?;
        let doc = self.dms.get_document(doc_id).await.map_err(|e| CoreError::Tool {
            tool: "get_document".to_string(),
            message: e.to_string(),
        })?;

        let names = self.tag_names().await?;
        let tag_names: Vec<&str> = doc
            .tags
            .iter()
            .filter_map(|id| names.get(id).map(String::as_str))
            .collect();
        if !tag_names.iter().any(|n| n.eq_ignore_ascii_case(&self.workflow.processed)) {
            return Err(CoreError::Tool {
                tool: "get_document".to_string(),
                message: format!("document {doc_id} is not fully processed"),
            });
        }
        Ok(self.render_documents(&[doc]).await?)
    }

    async fn filtered_listing(
        &self,
        tool: &str,
        args: &serde_json::Value,
        filter: DocumentFilter,
    ) -> CoreResult<String> {
        let limit = limit_arg(args);
        let documents = self
            .dms
            .fetch_all_by_filter(&filter)
            .await
            .map_err(|e| CoreError::Tool { tool: tool.to_string(), message: e.to_string() })?;

        let names = self.tag_names().await?;
        let processed: Vec<Document> = documents
            .into_iter()
            .filter(|doc| {
                doc.tags.iter().any(|id| {
                    names
                        .get(id)
                        .map(|n| n.eq_ignore_ascii_case(&self.workflow.processed))
                        .unwrap_or(false)
                })
            })
            .take(limit)
            .collect();

        if processed.is_empty() {
            return Ok("No matching processed documents.".to_string());
        }
        self.render_documents(&processed).await
    }

    async fn list_custom_fields(&self) -> CoreResult<String> {
        let fields = self.dms.list_custom_fields().await.map_err(|e| CoreError::Tool {
            tool: "list_custom_fields".to_string(),
            message: e.to_string(),
        })?;
        if fields.is_empty() {
            return Ok("No custom fields are defined.".to_string());
        }
        let lines: Vec<String> = fields
            .iter()
            .map(|f| format!("- {} (id {}, {})", f.name, f.id, f.data_type))
            .collect();
        Ok(format!("Custom fields:\n{}", lines.join("\n")))
    }

    async fn tag_names(&self) -> CoreResult<HashMap<i64, String>> {
        let tags = self.dms.list_tags().await.map_err(|e| CoreError::Tool {
            tool: "tags".to_string(),
            message: e.to_string(),
        })?;
        Ok(tags.into_iter().map(|t| (t.id, t.name)).collect())
    }

    async fn render_documents(&self, documents: &[Document]) -> CoreResult<String> {
        let tag_names = self.tag_names().await?;
        let correspondents: HashMap<i64, String> = self
            .dms
            .list_correspondents()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();
        let types: HashMap<i64, String> = self
            .dms
            .list_document_types()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();

        let lines: Vec<String> = documents
            .iter()
            .map(|doc| {
                let tags: Vec<&str> = doc
                    .tags
                    .iter()
                    .filter_map(|id| tag_names.get(id).map(String::as_str))
                    .filter(|name| !self.workflow.is_workflow_tag(name))
                    .collect();
                format!(
                    "- #{} \"{}\" correspondent={} type={} tags=[{}]",
                    doc.id,
                    doc.title,
                    doc.correspondent
                        .and_then(|id| correspondents.get(&id).cloned())
                        .unwrap_or_else(|| "-".to_string()),
                    doc.document_type
                        .and_then(|id| types.get(&id).cloned())
                        .unwrap_or_else(|| "-".to_string()),
                    tags.join(", ")
                )
            })
            .collect();
        Ok(format!("Documents:\n{}", lines.join("\n")))
    }
}

fn string_arg(tool: &str, args: &serde_json::Value, key: &str) -> CoreResult<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| CoreError::Tool {
            tool: tool.to_string(),
            message: format!("missing string argument '{key}'"),
        })
}

fn limit_arg(args: &serde_json::Value) -> usize {
    args.get("limit")
        .and_then(|v| v.as_u64())
        .map(|v| (v as usize).clamp(1, MAX_LIMIT))
        .unwrap_or(MAX_LIMIT)
}
