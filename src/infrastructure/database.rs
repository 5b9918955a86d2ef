//! SQLite connection pool management.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::sqlite::{embedded_migrations, MigrationError, Migrator};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to create pool: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Failed to create directory: {0}")]
    DirectoryCreationFailed(#[source] std::io::Error),
    #[error("Migration failed: {0}")]
    MigrationFailed(#[from] MigrationError),
}

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open (creating if missing) the core's SQLite store with WAL mode.
    pub async fn new(database_url: &str) -> Result<Self, ConnectionError> {
        ensure_database_directory(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|_| ConnectionError::InvalidDatabaseUrl(database_url.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(connect_options)
            .await
            .map_err(ConnectionError::PoolCreationFailed)?;

        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<usize, ConnectionError> {
        let applied = Migrator::new(self.pool.clone())
            .run_embedded_migrations(embedded_migrations())
            .await?;
        Ok(applied)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ensure_database_directory(database_url: &str) -> Result<(), ConnectionError> {
    let path = database_url.trim_start_matches("sqlite:");
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(ConnectionError::DirectoryCreationFailed)?;
        }
    }
    Ok(())
}
