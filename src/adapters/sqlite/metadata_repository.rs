//! SQLite implementations of the annotation and template stores.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{AnnotationTarget, MetadataAnnotation};
use crate::domain::ports::{AnnotationRepository, TemplateRepository};

#[derive(Clone)]
pub struct SqliteAnnotationRepository {
    pool: SqlitePool,
}

impl SqliteAnnotationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AnnotationRow {
    target: String,
    target_id: i64,
    name: String,
    description: String,
    category: Option<String>,
    excluded: i64,
}

impl TryFrom<AnnotationRow> for MetadataAnnotation {
    type Error = CoreError;

    fn try_from(row: AnnotationRow) -> CoreResult<Self> {
        Ok(MetadataAnnotation {
            target: AnnotationTarget::parse(&row.target).ok_or_else(|| {
                CoreError::Database(format!("bad annotation target '{}'", row.target))
            })?,
            target_id: row.target_id,
            name: row.name,
            description: row.description,
            category: row.category,
            excluded: row.excluded != 0,
        })
    }
}

#[async_trait]
impl AnnotationRepository for SqliteAnnotationRepository {
    async fn upsert(&self, annotation: &MetadataAnnotation) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO metadata_annotations
               (target, target_id, name, description, category, excluded)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(target, target_id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 category = excluded.category,
                 excluded = excluded.excluded"#,
        )
        .bind(annotation.target.as_str())
        .bind(annotation.target_id)
        .bind(&annotation.name)
        .bind(&annotation.description)
        .bind(&annotation.category)
        .bind(annotation.excluded as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, target: AnnotationTarget) -> CoreResult<Vec<MetadataAnnotation>> {
        let rows: Vec<AnnotationRow> =
            sqlx::query_as("SELECT * FROM metadata_annotations WHERE target = ? ORDER BY name")
                .bind(target.as_str())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(MetadataAnnotation::try_from).collect()
    }

    async fn remove(&self, target: AnnotationTarget, target_id: i64) -> CoreResult<()> {
        sqlx::query("DELETE FROM metadata_annotations WHERE target = ? AND target_id = ?")
            .bind(target.as_str())
            .bind(target_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteTemplateRepository {
    pool: SqlitePool,
}

impl SqliteTemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for SqliteTemplateRepository {
    async fn get(&self, step: &str, language: &str) -> CoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT content FROM prompt_templates WHERE step = ? AND language = ?",
        )
        .bind(step)
        .bind(language)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(content,)| content))
    }

    async fn set(&self, step: &str, language: &str, content: &str) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO prompt_templates (step, language, content) VALUES (?, ?, ?)
             ON CONFLICT(step, language) DO UPDATE SET content = excluded.content",
        )
        .bind(step)
        .bind(language)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, step: &str, language: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM prompt_templates WHERE step = ? AND language = ?")
            .bind(step)
            .bind(language)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> CoreResult<Vec<(String, String)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT step, language FROM prompt_templates ORDER BY step, language")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}
