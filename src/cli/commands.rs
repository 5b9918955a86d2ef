//! Command handlers.

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::{BlockScope, PipelineStep, ReviewKind};
use crate::services::scheduler::ProcessorFactory;
use crate::services::{
    maintenance, AutoProcessor, BootstrapAnalyzer, BootstrapScope, DocumentProcessor, JobStatus,
    PipelineOutcome, RejectionFeedback,
};

use super::runtime::AppContext;
use super::{ReviewCommands, SettingsCommands, TemplateCommands};

pub async fn handle_process(
    ctx: &AppContext,
    document_id: i64,
    step: Option<String>,
    stream: bool,
    json: bool,
) -> Result<()> {
    let step = step
        .map(|s| PipelineStep::parse(&s).with_context(|| format!("unknown step '{s}'")))
        .transpose()?;
    let settings = ctx.settings.load().await?;
    let pipeline = ctx.build_pipeline(&settings)?;

    if stream {
        let mut rx = pipeline.process_document_stream(document_id, step);
        while let Some(event) = rx.recv().await {
            println!("{}", serde_json::to_string(&event)?);
        }
        return Ok(());
    }

    match pipeline.process_document(document_id, step).await? {
        PipelineOutcome::Completed => {
            if json {
                println!("{}", serde_json::json!({ "status": "completed" }));
            } else {
                println!("document {document_id} is already fully processed");
            }
        }
        PipelineOutcome::Ran(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let status = if result.skipped {
                    "skipped"
                } else if result.success {
                    "ok"
                } else {
                    "failed"
                };
                println!(
                    "step {} -> {}{}{}",
                    result.step,
                    status,
                    result
                        .value
                        .as_deref()
                        .map(|v| format!(": {v}"))
                        .unwrap_or_default(),
                    if result.needs_review { " (queued for review)" } else { "" },
                );
            }
        }
    }
    Ok(())
}

pub async fn handle_watch(ctx: &AppContext) -> Result<()> {
    let factory: Arc<dyn ProcessorFactory> = Arc::new(ctx.clone());
    let scheduler = AutoProcessor::new(ctx.settings.clone(), factory);
    scheduler.start()?;
    println!("auto-processing loop running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    scheduler.stop().await?;

    let status = scheduler.status();
    println!("processed {} document step(s), {} error(s)", status.processed, status.errors);
    Ok(())
}

pub async fn handle_reviews(ctx: &AppContext, command: ReviewCommands, json: bool) -> Result<()> {
    let settings = ctx.settings.load().await?;
    let service = ctx.build_review_service(&settings)?;

    match command {
        ReviewCommands::List { kind } => {
            let kind = kind
                .map(|k| ReviewKind::parse(&k).with_context(|| format!("unknown kind '{k}'")))
                .transpose()?;
            let reviews = service.list(kind).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reviews)?);
                return Ok(());
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec![
                "id", "kind", "document", "suggestion", "attempts", "feedback",
            ]);
            for review in &reviews {
                table.add_row(vec![
                    review.id.to_string(),
                    review.kind.to_string(),
                    if review.document_id == 0 {
                        "-".to_string()
                    } else {
                        format!("#{} {}", review.document_id, review.document_title)
                    },
                    review.suggestion.clone(),
                    review.attempts.to_string(),
                    review.last_feedback.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        ReviewCommands::Approve { id, value } => {
            let id = Uuid::parse_str(&id).context("invalid review id")?;
            let outcome = service.approve(id, value.as_deref()).await?;
            match (outcome.applied, outcome.message) {
                (true, Some(message)) => println!("applied ({message})"),
                (true, None) => println!("applied"),
                (false, message) => {
                    println!("not applied: {}", message.unwrap_or_default())
                }
            }
        }
        ReviewCommands::Reject { id, block, scope, reason, category } => {
            let id = Uuid::parse_str(&id).context("invalid review id")?;
            if block {
                let scope = BlockScope::parse(&scope)
                    .with_context(|| format!("unknown scope '{scope}'"))?;
                service
                    .reject_with_feedback(
                        id,
                        RejectionFeedback { block: true, scope, reason, category },
                    )
                    .await?;
            } else {
                service.reject(id).await?;
            }
            println!("rejected");
        }
        ReviewCommands::Merge { ids, name } => {
            let ids: Vec<Uuid> = ids
                .iter()
                .map(|id| Uuid::parse_str(id).context("invalid review id"))
                .collect::<Result<_>>()?;
            let merged = service.merge(&ids, &name).await?;
            println!("merged into {} (\"{}\")", merged.id, merged.suggestion);
        }
    }
    Ok(())
}

pub async fn handle_bootstrap(ctx: &AppContext, scope: String, json: bool) -> Result<()> {
    let scope = BootstrapScope::parse(&scope)
        .with_context(|| format!("unknown scope '{scope}'"))?;
    let settings = ctx.settings.load().await?;
    let dms = ctx.build_dms(&settings)?;
    let analyzer = BootstrapAnalyzer::new(dms, ctx.reviews.clone());
    analyzer.start(scope)?;

    // The job is detached; poll until it settles.
    loop {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let progress = analyzer.progress();
        if progress.status != JobStatus::Running {
            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                println!(
                    "bootstrap {:?}: {} suggestion(s) across {} categories",
                    progress.status, progress.suggestions_found, progress.categories_processed
                );
                if let Some(error) = progress.error {
                    bail!("bootstrap failed: {error}");
                }
            }
            return Ok(());
        }
    }
}

pub async fn handle_settings(ctx: &AppContext, command: SettingsCommands) -> Result<()> {
    match command {
        SettingsCommands::Get => {
            let settings = ctx.settings.load().await?;
            for (key, value) in settings.to_map()? {
                let value = if key == "dms_token" && !value.is_empty() {
                    "********".to_string()
                } else {
                    value
                };
                println!("{key} = {value}");
            }
        }
        SettingsCommands::Set { key, value } => {
            ctx.settings.update(&key, &value).await?;
            println!("{key} updated");
        }
        SettingsCommands::Reset { key } => {
            ctx.settings.reset(&key).await?;
            println!("{key} reset to default");
        }
    }
    Ok(())
}

pub async fn handle_stats(ctx: &AppContext, json: bool) -> Result<()> {
    let settings = ctx.settings.load().await?;
    let dms = ctx.build_dms(&settings)?;
    let stats = maintenance::queue_statistics(dms.as_ref(), &settings).await?;

    if json {
        let map: HashMap<_, _> = stats.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["workflow tag", "documents"]);
    for (tag, count) in stats {
        table.add_row(vec![tag, count.to_string()]);
    }
    println!("{table}");
    Ok(())
}

pub async fn handle_repair_colors(ctx: &AppContext) -> Result<()> {
    let settings = ctx.settings.load().await?;
    let dms = ctx.build_dms(&settings)?;
    let repaired = maintenance::repair_tag_colors(dms.as_ref(), &settings).await?;
    println!("repaired {repaired} workflow tag color(s)");
    Ok(())
}

pub async fn handle_prune_logs(ctx: &AppContext, days: i64) -> Result<()> {
    let removed = maintenance::prune_logs(ctx.logs.clone(), days).await?;
    println!("removed {removed} log entr(ies)");
    Ok(())
}

pub async fn handle_logs(ctx: &AppContext, document_id: i64, json: bool) -> Result<()> {
    let entries = ctx.logs.list_for_document(document_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    // Render the parent/child forest with indentation, preserving emit
    // order within each level.
    let mut children: HashMap<Option<Uuid>, Vec<&crate::domain::models::LogEntry>> =
        HashMap::new();
    for entry in &entries {
        children.entry(entry.parent_id).or_default().push(entry);
    }
    fn print_level(
        children: &HashMap<Option<Uuid>, Vec<&crate::domain::models::LogEntry>>,
        parent: Option<Uuid>,
        depth: usize,
    ) {
        let Some(level) = children.get(&parent) else { return };
        for entry in level {
            println!(
                "{}[{}] {} {}",
                "  ".repeat(depth),
                entry.timestamp.format("%H:%M:%S"),
                entry.event.as_str(),
                entry.payload,
            );
            print_level(children, Some(entry.id), depth + 1);
        }
    }
    print_level(&children, None, 0);
    Ok(())
}

pub async fn handle_templates(ctx: &AppContext, command: TemplateCommands) -> Result<()> {
    match command {
        TemplateCommands::List => {
            for (step, language) in ctx.templates.list_overrides().await? {
                println!("{step} ({language})");
            }
        }
        TemplateCommands::Set { key, language, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            ctx.templates.set_override(&key, &language, &content).await?;
            println!("{key} ({language}) updated");
        }
        TemplateCommands::Remove { key, language } => {
            ctx.templates.remove_override(&key, &language).await?;
            println!("{key} ({language}) removed");
        }
    }
    Ok(())
}
