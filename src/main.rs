//! Scrivener CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use scrivener::cli::{commands, AppContext, Cli, Commands};
use scrivener::infrastructure::{logging, BootstrapConfig, DatabaseConnection};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = BootstrapConfig::load().context("Failed to load configuration")?;
    logging::init(&config);

    let db = DatabaseConnection::new(&config.database_url())
        .await
        .context("Failed to open database")?;
    db.migrate().await.context("Failed to run database migrations")?;

    let ctx = AppContext::new(db.pool().clone());

    match cli.command {
        Commands::Process { document_id, step, stream } => {
            commands::handle_process(&ctx, document_id, step, stream, cli.json).await
        }
        Commands::Watch => commands::handle_watch(&ctx).await,
        Commands::Reviews(command) => commands::handle_reviews(&ctx, command, cli.json).await,
        Commands::Bootstrap { scope } => commands::handle_bootstrap(&ctx, scope, cli.json).await,
        Commands::Settings(command) => commands::handle_settings(&ctx, command).await,
        Commands::Stats => commands::handle_stats(&ctx, cli.json).await,
        Commands::RepairColors => commands::handle_repair_colors(&ctx).await,
        Commands::PruneLogs { days } => commands::handle_prune_logs(&ctx, days).await,
        Commands::Logs { document_id } => commands::handle_logs(&ctx, document_id, cli.json).await,
        Commands::Templates(command) => commands::handle_templates(&ctx, command).await,
    }
}
