//! Housekeeping: queue statistics, workflow tag color repair, log pruning.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::domain::errors::CoreResult;
use crate::domain::models::Settings;
use crate::domain::ports::{DocumentStore, LogRepository};

/// Color applied to workflow tags so they stand out in the DMS UI.
const WORKFLOW_TAG_COLOR: &str = "#7c3aed";

/// Document counts per workflow tag, in scan order plus the terminal and
/// flag tags.
pub async fn queue_statistics(
    dms: &dyn DocumentStore,
    settings: &Settings,
) -> CoreResult<Vec<(String, usize)>> {
    let workflow = &settings.workflow;
    let mut stats = Vec::new();
    for tag in workflow
        .scan_order()
        .into_iter()
        .chain([workflow.processed.as_str(), workflow.manual_review.as_str(), workflow.failed.as_str()])
    {
        let count = dms.count_by_tag(tag).await?;
        stats.push((tag.to_string(), count));
    }
    Ok(stats)
}

/// Reset the color of any workflow tag that drifted from the configured
/// palette. Returns how many tags were repaired.
pub async fn repair_tag_colors(
    dms: &dyn DocumentStore,
    settings: &Settings,
) -> CoreResult<usize> {
    let workflow = &settings.workflow;
    let tags = dms.list_tags().await?;
    let mut repaired = 0;
    for tag in tags {
        if !workflow.is_workflow_tag(&tag.name) {
            continue;
        }
        let drifted = tag
            .color
            .as_deref()
            .map(|c| !c.eq_ignore_ascii_case(WORKFLOW_TAG_COLOR))
            .unwrap_or(true);
        if drifted {
            dms.set_tag_color(tag.id, WORKFLOW_TAG_COLOR).await?;
            repaired += 1;
        }
    }
    Ok(repaired)
}

/// Delete processing-log entries older than the retention window.
pub async fn prune_logs(
    logs: Arc<dyn LogRepository>,
    retention_days: i64,
) -> CoreResult<u64> {
    let cutoff = Utc::now() - Duration::days(retention_days);
    logs.prune_before(cutoff).await
}
