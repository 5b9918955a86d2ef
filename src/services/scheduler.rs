//! Auto-processing scheduler.
//!
//! A single-flight background loop: scan the workflow tags for the first
//! eligible document, run exactly one pipeline step on it, repeat. With no
//! work pending, the loop sleeps for the configured interval, racing the
//! sleep against a manual trigger and the stop signal. Settings are
//! re-read every iteration, so endpoint changes and the enable toggle take
//! effect without a restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{Document, PipelineState, PipelineStep, Settings};
use crate::domain::ports::DocumentStore;

use super::pipeline::SharedProcessor;
use super::settings_service::SettingsService;

/// Per-tag batch size of the eligibility scan. Small on purpose: stale
/// documents carrying `processed` plus an intermediate tag must not mask
/// real work.
const SCAN_BATCH: usize = 10;

/// Backoff while auto-processing is disabled in settings.
const DISABLED_POLL: Duration = Duration::from_secs(5);

/// Builds the per-iteration collaborators from a fresh settings snapshot.
pub trait ProcessorFactory: Send + Sync {
    fn build(
        &self,
        settings: &Settings,
    ) -> CoreResult<(Arc<dyn DocumentStore>, SharedProcessor)>;
}

/// Observable scheduler state, read through [`AutoProcessor::status`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub auto_enabled: bool,
    pub current_document: Option<i64>,
    pub current_step: Option<PipelineStep>,
    pub processed: u64,
    pub errors: u64,
    pub last_check: Option<DateTime<Utc>>,
}

struct SchedulerShared {
    running: AtomicBool,
    /// Wakes the idle sleep on `trigger()`. `notify_waiters` only reaches
    /// a loop that is actually sleeping; triggers while processing are
    /// absorbed, since the loop re-polls immediately anyway.
    trigger: Notify,
    stop: Notify,
    status: Mutex<SchedulerStatus>,
}

pub struct AutoProcessor {
    settings: SettingsService,
    factory: Arc<dyn ProcessorFactory>,
    shared: Arc<SchedulerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AutoProcessor {
    pub fn new(settings: SettingsService, factory: Arc<dyn ProcessorFactory>) -> Self {
        Self {
            settings,
            factory,
            shared: Arc::new(SchedulerShared {
                running: AtomicBool::new(false),
                trigger: Notify::new(),
                stop: Notify::new(),
                status: Mutex::new(SchedulerStatus::default()),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Start the loop as a detached task. Fails when already running.
    pub fn start(&self) -> CoreResult<()> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Err(CoreError::Job("auto-processing is already running".to_string()));
        }
        {
            let mut status = self.shared.status.lock().unwrap();
            *status = SchedulerStatus { running: true, ..SchedulerStatus::default() };
        }

        let shared = self.shared.clone();
        let settings = self.settings.clone();
        let factory = self.factory.clone();
        let handle = tokio::spawn(async move {
            run_loop(shared, settings, factory).await;
        });
        *self.handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Stop the loop. An in-flight pipeline step is allowed to complete so
    /// the document is not left mid-transition.
    pub async fn stop(&self) -> CoreResult<()> {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Job("auto-processing is not running".to_string()));
        }
        self.shared.stop.notify_waiters();
        self.shared.trigger.notify_waiters();

        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.shared.status.lock().unwrap().running = false;
        Ok(())
    }

    /// Wake the loop if it is sleeping; no-op while it is processing.
    pub fn trigger(&self) {
        self.shared.trigger.notify_waiters();
    }

    pub fn status(&self) -> SchedulerStatus {
        self.shared.status.lock().unwrap().clone()
    }
}

async fn run_loop(
    shared: Arc<SchedulerShared>,
    settings_service: SettingsService,
    factory: Arc<dyn ProcessorFactory>,
) {
    tracing::info!("auto-processing loop started");
    while shared.running.load(Ordering::SeqCst) {
        let settings = match settings_service.load().await {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(%error, "failed to load settings; backing off");
                sleep_interruptible(&shared, DISABLED_POLL).await;
                continue;
            }
        };
        shared.status.lock().unwrap().auto_enabled = settings.auto_enabled;

        if !settings.auto_enabled {
            sleep_interruptible(&shared, DISABLED_POLL).await;
            continue;
        }

        let (dms, processor) = match factory.build(&settings) {
            Ok(pair) => pair,
            Err(error) => {
                tracing::warn!(%error, "failed to build pipeline collaborators");
                shared.status.lock().unwrap().errors += 1;
                sleep_interruptible(&shared, interval(&settings)).await;
                continue;
            }
        };

        let eligible = find_eligible_document(dms.as_ref(), &settings).await;
        shared.status.lock().unwrap().last_check = Some(Utc::now());

        match eligible {
            Ok(Some((document, step))) => {
                {
                    let mut status = shared.status.lock().unwrap();
                    status.current_document = Some(document.id);
                    status.current_step = Some(step);
                }
                let step_failed = match processor.process_document(document.id, None).await {
                    Ok(_) => {
                        shared.status.lock().unwrap().processed += 1;
                        false
                    }
                    Err(error) => {
                        tracing::warn!(%error, document_id = document.id,
                            "pipeline step failed");
                        shared.status.lock().unwrap().errors += 1;
                        // Flag the document; the tag is orthogonal and the
                        // step will be re-attempted on a later pass.
                        if let Err(error) =
                            dms.add_tag(document.id, &settings.workflow.failed).await
                        {
                            tracing::debug!(%error, "could not add failed tag");
                        }
                        true
                    }
                };
                {
                    let mut status = shared.status.lock().unwrap();
                    status.current_document = None;
                    status.current_step = None;
                }
                if step_failed {
                    // A persistently failing document would otherwise spin
                    // the loop hot against the same error.
                    sleep_interruptible(&shared, DISABLED_POLL).await;
                }
                // Re-poll: the transition just made may have produced the
                // next unit of work.
                continue;
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(%error, "eligibility scan failed");
                shared.status.lock().unwrap().errors += 1;
            }
        }

        sleep_interruptible(&shared, interval(&settings)).await;
    }
    tracing::info!("auto-processing loop stopped");
}

fn interval(settings: &Settings) -> Duration {
    Duration::from_secs(settings.interval_minutes.max(1) * 60)
}

async fn sleep_interruptible(shared: &SchedulerShared, duration: Duration) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = shared.trigger.notified() => {}
        _ = shared.stop.notified() => {}
    }
}

/// Walk the workflow tags in pipeline order and pick the first document
/// that still has work: not `processed`, not parked in `manual_review`.
pub async fn find_eligible_document(
    dms: &dyn DocumentStore,
    settings: &Settings,
) -> CoreResult<Option<(Document, PipelineStep)>> {
    let workflow = &settings.workflow;
    let tag_map: std::collections::HashMap<i64, String> =
        dms.list_tags().await?.into_iter().map(|t| (t.id, t.name)).collect();

    for tag in workflow.scan_order() {
        let batch = dms.list_by_tag(tag, SCAN_BATCH).await?;
        for document in batch {
            let names: Vec<String> = document
                .tags
                .iter()
                .filter_map(|id| tag_map.get(id).cloned())
                .collect();
            let is_processed =
                names.iter().any(|n| n.eq_ignore_ascii_case(&workflow.processed));
            let parked =
                names.iter().any(|n| n.eq_ignore_ascii_case(&workflow.manual_review));
            if is_processed || parked {
                continue;
            }
            let state = PipelineState::from_tag_names(&names, workflow);
            if let Some(step) = state.next_step(&settings.steps) {
                return Ok(Some((document, step)));
            }
        }
    }
    Ok(None)
}
