//! Review-queue service: approval application, rejection with blocking,
//! and pending-suggestion merging.

mod common;

use std::sync::Arc;

use scrivener::adapters::sqlite::{SqliteBlocklistRepository, SqliteReviewRepository};
use scrivener::domain::models::{
    BlockScope, Document, PendingReview, PipelineState, ReviewKind,
};
use scrivener::domain::ports::{BlocklistRepository, ReviewRepository};
use scrivener::services::{RejectionFeedback, ReviewService};

use common::{setup_test_db, test_settings, FakeDms};

fn seeded_dms() -> Arc<FakeDms> {
    let dms = Arc::new(FakeDms::new());
    let settings = test_settings();
    for (id, name) in settings.workflow.all().iter().enumerate() {
        dms.insert_tag(100 + id as i64, name);
    }
    dms
}

fn doc(id: i64, tags: Vec<i64>) -> Document {
    Document {
        id,
        title: format!("doc {id}"),
        correspondent: None,
        document_type: None,
        tags,
        custom_fields: Vec::new(),
        content: String::new(),
        created: None,
    }
}

async fn service_with(
    dms: Arc<FakeDms>,
) -> (ReviewService, Arc<dyn ReviewRepository>, Arc<dyn BlocklistRepository>) {
    let pool = setup_test_db().await;
    let reviews: Arc<dyn ReviewRepository> = Arc::new(SqliteReviewRepository::new(pool.clone()));
    let blocklist: Arc<dyn BlocklistRepository> =
        Arc::new(SqliteBlocklistRepository::new(pool.clone()));
    let service =
        ReviewService::new(dms, reviews.clone(), blocklist.clone(), test_settings());
    (service, reviews, blocklist)
}

/// Approving a queued correspondent creates the entity, assigns it,
/// advances the workflow tag, and lifts the manual-review flag.
#[tokio::test]
async fn approving_correspondent_applies_and_advances() {
    let settings = test_settings();
    let dms = seeded_dms();
    // title_done + manual_review (queued by the correspondent agent).
    dms.insert_document(doc(42, vec![103, 109]));

    let (service, reviews, _) = service_with(dms.clone()).await;
    let review = PendingReview::new(42, ReviewKind::Correspondent, "New Bank AG")
        .with_title("doc 42")
        .with_next_tag(&settings.workflow.correspondent_done);
    reviews.upsert(&review).await.unwrap();

    let outcome = service.approve(review.id, None).await.unwrap();
    assert!(outcome.applied);

    let updated = dms.document(42);
    assert!(updated.correspondent.is_some());
    assert!(dms.correspondent_exists("New Bank AG"));

    let names = dms.document_tag_names(42);
    assert_eq!(
        PipelineState::from_tag_names(&names, &settings.workflow),
        PipelineState::CorrespondentDone
    );
    assert!(!names.iter().any(|n| n == &settings.workflow.manual_review));
    assert!(reviews.get(review.id).await.unwrap().is_none());

    // Idempotent: a second approval of the resolved id changes nothing.
    let before = dms.document(42);
    let again = service.approve(review.id, None).await.unwrap();
    assert!(!again.applied);
    assert_eq!(dms.document(42).correspondent, before.correspondent);
}

/// Approving with a selected alternative applies that value instead of
/// the primary suggestion.
#[tokio::test]
async fn approval_honors_selected_value() {
    let dms = seeded_dms();
    dms.insert_document(doc(9, vec![105])); // document_type_done
    let (service, reviews, _) = service_with(dms.clone()).await;

    let mut review = PendingReview::new(9, ReviewKind::Tag, "Warranty");
    review.alternatives = vec!["Guarantee".to_string()];
    reviews.upsert(&review).await.unwrap();

    service.approve(review.id, Some("Guarantee")).await.unwrap();
    let names = dms.document_tag_names(9);
    assert!(names.iter().any(|n| n == "Guarantee"));
    assert!(!names.iter().any(|n| n == "Warranty"));
}

/// Rejection with the block flag records a blocked suggestion that the
/// agents will consult.
#[tokio::test]
async fn rejecting_with_block_populates_blocklist() {
    let dms = seeded_dms();
    dms.insert_document(doc(5, vec![103]));
    let (service, reviews, blocklist) = service_with(dms.clone()).await;

    let review = PendingReview::new(5, ReviewKind::Correspondent, "Generic Corp");
    reviews.upsert(&review).await.unwrap();

    service
        .reject_with_feedback(
            review.id,
            RejectionFeedback {
                block: true,
                scope: BlockScope::Kind,
                reason: Some("not a real correspondent".to_string()),
                category: None,
            },
        )
        .await
        .unwrap();

    assert!(reviews.get(review.id).await.unwrap().is_none());
    assert!(blocklist
        .is_blocked("generic corp", ReviewKind::Correspondent)
        .await
        .unwrap());
    assert!(!blocklist.is_blocked("generic corp", ReviewKind::Tag).await.unwrap());
}

/// Plain rejection removes the review without blocking anything.
#[tokio::test]
async fn plain_reject_does_not_block() {
    let dms = seeded_dms();
    dms.insert_document(doc(5, vec![103]));
    let (service, reviews, blocklist) = service_with(dms.clone()).await;

    let review = PendingReview::new(5, ReviewKind::Correspondent, "Generic Corp");
    reviews.upsert(&review).await.unwrap();
    service.reject(review.id).await.unwrap();

    assert!(reviews.get(review.id).await.unwrap().is_none());
    assert!(!blocklist
        .is_blocked("generic corp", ReviewKind::Correspondent)
        .await
        .unwrap());
}

/// Merging pending suggestions collapses them into one record carrying
/// the union of their document ids.
#[tokio::test]
async fn merge_collapses_pending_suggestions() {
    let dms = seeded_dms();
    dms.insert_document(doc(1, vec![105]));
    dms.insert_document(doc(2, vec![105]));
    let (service, reviews, _) = service_with(dms.clone()).await;

    let a = PendingReview::new(1, ReviewKind::Tag, "Warranty");
    let b = PendingReview::new(2, ReviewKind::Tag, "Guarantee");
    reviews.upsert(&a).await.unwrap();
    reviews.upsert(&b).await.unwrap();

    let merged = service.merge(&[a.id, b.id], "Warranty").await.unwrap();
    assert_eq!(merged.suggestion, "Warranty");
    let ids = merged.metadata["document_ids"]
        .as_array()
        .expect("document_ids must be a list")
        .iter()
        .filter_map(|v| v.as_i64())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2]);

    let remaining = reviews.list(Some(ReviewKind::Tag)).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, merged.id);
}
