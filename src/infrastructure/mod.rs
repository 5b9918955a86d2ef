//! Infrastructure: bootstrap configuration, logging, database connection.

pub mod config;
pub mod database;
pub mod logging;

pub use config::BootstrapConfig;
pub use database::{ConnectionError, DatabaseConnection};
