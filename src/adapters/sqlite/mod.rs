//! SQLite adapters for the core's own store.

pub mod log_repository;
pub mod metadata_repository;
pub mod migrations;
pub mod review_repository;
pub mod settings_repository;

pub use log_repository::SqliteLogRepository;
pub use metadata_repository::{SqliteAnnotationRepository, SqliteTemplateRepository};
pub use migrations::{embedded_migrations, Migration, MigrationError, Migrator};
pub use review_repository::{SqliteBlocklistRepository, SqliteReviewRepository};
pub use settings_repository::SqliteSettingsRepository;
