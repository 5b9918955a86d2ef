//! Bootstrap schema-cleanup analyzer.
//!
//! Mines the DMS for merge candidates (similar names) and delete
//! candidates (unused entities) and turns each into a pending review. Runs
//! as a detached job with a shared progress record and cooperative
//! cancellation checked between categories and between emissions.

use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{normalize_name, EntityKind, NamedEntity, PendingReview, ReviewKind};
use crate::domain::ports::{DocumentStore, ReviewRepository};

/// Names at or below this length go through Levenshtein matching; longer
/// names only match exactly or by substring.
const LEVENSHTEIN_MAX_LEN: usize = 20;

/// Minimum Levenshtein similarity to emit a merge candidate.
const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Which entity categories to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapScope {
    All,
    Correspondents,
    DocumentTypes,
    Tags,
}

impl BootstrapScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "correspondents" => Some(Self::Correspondents),
            "document_types" => Some(Self::DocumentTypes),
            "tags" => Some(Self::Tags),
            _ => None,
        }
    }

    fn categories(&self) -> Vec<EntityKind> {
        match self {
            Self::All => {
                vec![EntityKind::Correspondent, EntityKind::DocumentType, EntityKind::Tag]
            }
            Self::Correspondents => vec![EntityKind::Correspondent],
            Self::DocumentTypes => vec![EntityKind::DocumentType],
            Self::Tags => vec![EntityKind::Tag],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Error,
}

/// Shared progress record exposed to the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapProgress {
    pub status: JobStatus,
    pub categories_total: usize,
    pub categories_processed: usize,
    pub suggestions_found: usize,
    /// Suggestions per entity kind.
    pub by_kind: std::collections::HashMap<String, usize>,
    /// Human-readable label of the current phase.
    pub current_phase: String,
    /// Entities in the category currently being scanned.
    pub current_entity_count: usize,
    pub avg_secs_per_category: f64,
    pub eta_secs: f64,
    pub error: Option<String>,
}

impl Default for BootstrapProgress {
    fn default() -> Self {
        Self {
            status: JobStatus::Idle,
            categories_total: 0,
            categories_processed: 0,
            suggestions_found: 0,
            by_kind: Default::default(),
            current_phase: String::new(),
            current_entity_count: 0,
            avg_secs_per_category: 0.0,
            eta_secs: 0.0,
            error: None,
        }
    }
}

pub struct BootstrapAnalyzer {
    dms: Arc<dyn DocumentStore>,
    reviews: Arc<dyn ReviewRepository>,
    progress: Arc<Mutex<BootstrapProgress>>,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl BootstrapAnalyzer {
    pub fn new(dms: Arc<dyn DocumentStore>, reviews: Arc<dyn ReviewRepository>) -> Self {
        Self {
            dms,
            reviews,
            progress: Arc::new(Mutex::new(BootstrapProgress::default())),
            cancel: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the analysis as a detached task. Fails while a run is active.
    pub fn start(&self, scope: BootstrapScope) -> CoreResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CoreError::Job("bootstrap analysis is already running".to_string()));
        }
        self.cancel.store(false, Ordering::SeqCst);

        let categories = scope.categories();
        {
            let mut progress = self.progress.lock().unwrap();
            *progress = BootstrapProgress {
                status: JobStatus::Running,
                categories_total: categories.len(),
                ..BootstrapProgress::default()
            };
        }

        let dms = self.dms.clone();
        let reviews = self.reviews.clone();
        let progress = self.progress.clone();
        let cancel = self.cancel.clone();
        let running = self.running.clone();
        tokio::spawn(async move {
            let result = run_analysis(&*dms, &*reviews, &progress, &cancel, categories).await;
            let mut p = progress.lock().unwrap();
            match result {
                Ok(()) if cancel.load(Ordering::SeqCst) => p.status = JobStatus::Cancelled,
                Ok(()) => p.status = JobStatus::Completed,
                Err(error) => {
                    p.status = JobStatus::Error;
                    p.error = Some(error.to_string());
                }
            }
            running.store(false, Ordering::SeqCst);
        });
        Ok(())
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn progress(&self) -> BootstrapProgress {
        self.progress.lock().unwrap().clone()
    }
}

async fn run_analysis(
    dms: &dyn DocumentStore,
    reviews: &dyn ReviewRepository,
    progress: &Mutex<BootstrapProgress>,
    cancel: &AtomicBool,
    categories: Vec<EntityKind>,
) -> CoreResult<()> {
    let started = Instant::now();
    let total = categories.len();

    for (index, kind) in categories.into_iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            return Ok(());
        }

        let entities = match kind {
            EntityKind::Correspondent => dms.list_correspondents().await?,
            EntityKind::DocumentType => dms.list_document_types().await?,
            EntityKind::Tag => dms
                .list_tags()
                .await?
                .into_iter()
                .map(|t| NamedEntity {
                    id: t.id,
                    name: t.name,
                    document_count: t.document_count,
                })
                .collect(),
        };
        {
            let mut p = progress.lock().unwrap();
            p.current_phase = format!("scanning {}s", kind.as_str());
            p.current_entity_count = entities.len();
        }

        let mut emitted = 0usize;

        for candidate in merge_candidates(&entities) {
            if cancel.load(Ordering::SeqCst) {
                return Ok(());
            }
            let review = merge_review(kind, &candidate);
            reviews.upsert(&review).await?;
            emitted += 1;
        }

        // Unused entities become delete candidates, except tags: a
        // zero-count tag may be a workflow tag waiting for its first
        // document.
        if kind != EntityKind::Tag {
            for entity in entities.iter().filter(|e| e.document_count == 0) {
                if cancel.load(Ordering::SeqCst) {
                    return Ok(());
                }
                let review = delete_review(kind, entity);
                reviews.upsert(&review).await?;
                emitted += 1;
            }
        }

        let mut p = progress.lock().unwrap();
        p.categories_processed = index + 1;
        p.suggestions_found += emitted;
        *p.by_kind.entry(kind.as_str().to_string()).or_insert(0) += emitted;
        p.avg_secs_per_category = started.elapsed().as_secs_f64() / (index + 1) as f64;
        p.eta_secs = p.avg_secs_per_category * (total - (index + 1)) as f64;
    }
    Ok(())
}

/// A proposed merge of `source` into `target`.
#[derive(Debug, Clone)]
pub struct MergeCandidate {
    pub source: NamedEntity,
    pub target: NamedEntity,
    pub similarity: f64,
}

/// Pairwise similarity scan. Each unordered pair appears at most once;
/// the higher-count entity wins the target role, ties keep input order.
pub fn merge_candidates(entities: &[NamedEntity]) -> Vec<MergeCandidate> {
    let mut candidates = Vec::new();
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let a = &entities[i];
            let b = &entities[j];
            let similarity = name_similarity(&a.name, &b.name);
            if similarity < SIMILARITY_THRESHOLD {
                continue;
            }
            let (target, source) = if b.document_count > a.document_count {
                (b.clone(), a.clone())
            } else {
                (a.clone(), b.clone())
            };
            candidates.push(MergeCandidate { source, target, similarity });
        }
    }
    candidates
}

/// Similarity of two entity names in `[0, 1]`.
///
/// Exact match after normalization is 1.0, substring containment 0.8, and
/// short names fall back to Levenshtein similarity `1 - d / max_len`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a <= LEVENSHTEIN_MAX_LEN && len_b <= LEVENSHTEIN_MAX_LEN {
        let distance = strsim::levenshtein(&a, &b);
        let max_len = len_a.max(len_b);
        return 1.0 - distance as f64 / max_len as f64;
    }
    0.0
}

fn merge_review(kind: EntityKind, candidate: &MergeCandidate) -> PendingReview {
    let mut review = PendingReview::new(0, ReviewKind::SchemaMerge, &candidate.target.name);
    review.reasoning = format!(
        "\"{}\" ({} docs) looks like a duplicate of \"{}\" ({} docs), similarity {:.2}",
        candidate.source.name,
        candidate.source.document_count,
        candidate.target.name,
        candidate.target.document_count,
        candidate.similarity,
    );
    review.metadata = json!({
        "entity_kind": kind.as_str(),
        "source_id": candidate.source.id,
        "source_name": candidate.source.name,
        "target_id": candidate.target.id,
        "target_name": candidate.target.name,
        "similarity": candidate.similarity,
    });
    review
}

fn delete_review(kind: EntityKind, entity: &NamedEntity) -> PendingReview {
    let mut review = PendingReview::new(0, ReviewKind::SchemaDelete, &entity.name);
    review.reasoning = format!("\"{}\" is not referenced by any document", entity.name);
    review.metadata = json!({
        "entity_kind": kind.as_str(),
        "entity_id": entity.id,
        "entity_name": entity.name,
    });
    review
}
