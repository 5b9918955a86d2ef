//! Command-line interface.

pub mod commands;
pub mod runtime;

pub use runtime::AppContext;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scrivener",
    about = "LLM-driven metadata inference for document management systems",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one pipeline step on a document.
    Process {
        document_id: i64,
        /// Run this specific step instead of deriving it from the tags.
        #[arg(long)]
        step: Option<String>,
        /// Stream progress events while the step runs.
        #[arg(long)]
        stream: bool,
    },
    /// Run the auto-processing loop until interrupted.
    Watch,
    /// Review queue operations.
    #[command(subcommand)]
    Reviews(ReviewCommands),
    /// Mine the DMS for merge/delete candidates.
    Bootstrap {
        /// all | correspondents | document_types | tags
        #[arg(default_value = "all")]
        scope: String,
    },
    /// Settings operations.
    #[command(subcommand)]
    Settings(SettingsCommands),
    /// Document counts per workflow tag.
    Stats,
    /// Reset drifted workflow tag colors.
    RepairColors,
    /// Delete processing-log entries past the retention window.
    PruneLogs {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Show the processing log of a document as a tree.
    Logs { document_id: i64 },
    /// Prompt template overrides.
    #[command(subcommand)]
    Templates(TemplateCommands),
}

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// List pending reviews.
    List {
        /// Filter by kind.
        #[arg(long)]
        kind: Option<String>,
    },
    /// Apply a pending review.
    Approve {
        id: String,
        /// Apply this value instead of the primary suggestion.
        #[arg(long)]
        value: Option<String>,
    },
    /// Remove a pending review.
    Reject {
        id: String,
        /// Also block the suggestion from being proposed again.
        #[arg(long)]
        block: bool,
        /// global | kind
        #[arg(long, default_value = "kind")]
        scope: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Collapse several pending suggestions into one canonical name.
    Merge {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the effective settings.
    Get,
    /// Update one setting.
    Set { key: String, value: String },
    /// Revert one setting to its default.
    Reset { key: String },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List template overrides.
    List,
    /// Set an override from a file.
    Set {
        key: String,
        language: String,
        file: std::path::PathBuf,
    },
    /// Remove an override.
    Remove { key: String, language: String },
}
