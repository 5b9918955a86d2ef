//! SQLite database migration management.

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to execute migration {version}: {source}")]
    ExecutionError { version: i64, #[source] source: sqlx::Error },
    #[error("Failed to get schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    pub sql: String,
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_embedded_migrations(
        &self,
        migrations: Vec<Migration>,
    ) -> Result<usize, MigrationError> {
        self.ensure_migrations_table().await?;
        let current_version = self.get_current_version().await?;
        let pending: Vec<_> =
            migrations.into_iter().filter(|m| m.version > current_version).collect();

        if pending.is_empty() {
            return Ok(0);
        }

        for migration in &pending {
            self.apply_migration(migration).await?;
        }

        Ok(pending.len())
    }

    async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                description TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MigrationError::ExecutionError { version: 0, source: e })?;
        Ok(())
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let result: Option<(i64,)> =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_optional(&self.pool)
                .await
                .map_err(MigrationError::VersionCheckError)?;
        Ok(result.map(|(v,)| v).unwrap_or(0))
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), MigrationError> {
        sqlx::raw_sql(&migration.sql)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrationError::ExecutionError { version: migration.version, source: e })?;

        sqlx::query("INSERT OR IGNORE INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrationError::ExecutionError { version: migration.version, source: e })?;
        Ok(())
    }
}

/// The embedded schema for the core's own store.
pub fn embedded_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "settings key/value table".to_string(),
            sql: "CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                  )"
            .to_string(),
        },
        Migration {
            version: 2,
            description: "pending reviews".to_string(),
            sql: "CREATE TABLE IF NOT EXISTS pending_reviews (
                    id TEXT PRIMARY KEY,
                    document_id INTEGER NOT NULL,
                    document_title TEXT NOT NULL DEFAULT '',
                    kind TEXT NOT NULL,
                    suggestion TEXT NOT NULL,
                    reasoning TEXT NOT NULL DEFAULT '',
                    alternatives TEXT NOT NULL DEFAULT '[]',
                    attempts INTEGER NOT NULL DEFAULT 0,
                    last_feedback TEXT,
                    next_tag TEXT,
                    metadata TEXT NOT NULL DEFAULT 'null',
                    created_at TEXT NOT NULL
                  );
                  CREATE INDEX IF NOT EXISTS idx_pending_reviews_doc_kind
                    ON pending_reviews (document_id, kind);"
            .to_string(),
        },
        Migration {
            version: 3,
            description: "blocked suggestions".to_string(),
            sql: "CREATE TABLE IF NOT EXISTS blocked_suggestions (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    normalized TEXT NOT NULL,
                    scope TEXT NOT NULL,
                    kind TEXT,
                    reason TEXT,
                    category TEXT,
                    document_id INTEGER,
                    created_at TEXT NOT NULL
                  );
                  CREATE INDEX IF NOT EXISTS idx_blocked_normalized
                    ON blocked_suggestions (normalized);"
            .to_string(),
        },
        Migration {
            version: 4,
            description: "metadata annotations".to_string(),
            sql: "CREATE TABLE IF NOT EXISTS metadata_annotations (
                    target TEXT NOT NULL,
                    target_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    category TEXT,
                    excluded INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (target, target_id)
                  )"
            .to_string(),
        },
        Migration {
            version: 5,
            description: "processing log".to_string(),
            sql: "CREATE TABLE IF NOT EXISTS processing_log (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    document_id INTEGER NOT NULL,
                    timestamp TEXT NOT NULL,
                    step TEXT NOT NULL,
                    event TEXT NOT NULL,
                    payload TEXT NOT NULL DEFAULT 'null',
                    parent_id TEXT
                  );
                  CREATE INDEX IF NOT EXISTS idx_processing_log_doc
                    ON processing_log (document_id);"
            .to_string(),
        },
        Migration {
            version: 6,
            description: "prompt template overrides".to_string(),
            sql: "CREATE TABLE IF NOT EXISTS prompt_templates (
                    step TEXT NOT NULL,
                    language TEXT NOT NULL,
                    content TEXT NOT NULL,
                    PRIMARY KEY (step, language)
                  )"
            .to_string(),
        },
    ]
}
