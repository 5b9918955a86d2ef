//! End-to-end pipeline scenarios over the in-memory DMS and scripted
//! models.

mod common;

use serde_json::json;
use std::sync::Arc;

use scrivener::domain::models::{
    Document, PipelineState, ReviewKind, Settings, WorkflowTags,
};
use scrivener::domain::ports::ReviewRepository;
use scrivener::services::{DocumentProcessor, Pipeline, PipelineOutcome};

use common::{build_deps, setup_test_db, test_settings, AlwaysConfirm, FakeDms, ScriptedLlm};

fn workflow() -> WorkflowTags {
    WorkflowTags::default()
}

/// Seed the fake DMS with the workflow tags and one document.
fn seed_dms(doc: Document) -> Arc<FakeDms> {
    let dms = Arc::new(FakeDms::new());
    let w = workflow();
    for (id, name) in w.all().iter().enumerate() {
        dms.insert_tag(100 + id as i64, name);
    }
    dms.insert_document(doc);
    dms
}

fn document(id: i64, tag_names: &[&str], dms_tag_base: &WorkflowTags) -> Document {
    let w = dms_tag_base;
    let all = w.all();
    let tags = tag_names
        .iter()
        .map(|name| {
            100 + all
                .iter()
                .position(|t| t.eq_ignore_ascii_case(name))
                .expect("unknown workflow tag in fixture") as i64
        })
        .collect();
    Document {
        id,
        title: "scan_001.pdf".to_string(),
        correspondent: None,
        document_type: None,
        tags,
        custom_fields: Vec::new(),
        content: "PayPal payment receipt for Example Shop, December 2024. Order 12345."
            .to_string(),
        created: None,
    }
}

fn state_of(dms: &FakeDms, doc_id: i64, settings: &Settings) -> PipelineState {
    let names = dms.document_tag_names(doc_id);
    PipelineState::from_tag_names(&names, &settings.workflow)
}

/// Scenario: happy path from `pending` to `processed`, with OCR, summary,
/// and custom fields disabled. Each enabled step runs exactly once and
/// confirms on the first attempt.
#[tokio::test]
async fn happy_path_runs_to_processed() {
    let settings = test_settings();
    let w = &settings.workflow;
    let dms = seed_dms(document(17, &["pending"], w));
    dms.insert_correspondent(3, "PayPal", 12);
    dms.insert_document_type(5, "Receipt", 8);
    dms.insert_tag(12, "Electronics");

    let pool = setup_test_db().await;

    // One structured analysis per enabled model step, in pipeline order.
    let large = Arc::new(ScriptedLlm::new(vec![
        ScriptedLlm::structured(json!({
            "suggested_title": "PayPal payment to Example Shop — December 2024",
            "reasoning": "merchant and period from the receipt",
            "confidence": 0.9,
            "based_on_similar": []
        })),
        ScriptedLlm::structured(json!({
            "suggested_name": "PayPal",
            "is_new": false,
            "existing_id": 3,
            "reasoning": "sender of the receipt",
            "confidence": 0.95
        })),
        ScriptedLlm::structured(json!({
            "suggested_name": "Receipt",
            "is_new": false,
            "existing_id": 5,
            "reasoning": "payment receipt",
            "confidence": 0.95
        })),
        ScriptedLlm::structured(json!({
            "suggested_tags": [
                { "name": "Electronics", "is_new": false, "existing_tag_id": 12, "relevance": 0.8 }
            ],
            "tags_to_remove": [],
            "reasoning": "shop category",
            "confidence": 0.8
        })),
    ]));
    let deps = build_deps(
        dms.clone(),
        large,
        Arc::new(AlwaysConfirm),
        settings.clone(),
        &pool,
    )
    .await;
    let pipeline = Pipeline::new(deps);

    let expected = [
        PipelineState::OcrDone,          // ocr disabled: auto-transition
        PipelineState::TitleDone,        // summary disabled: next is title
        PipelineState::CorrespondentDone,
        PipelineState::DocumentTypeDone,
        PipelineState::TagsDone,
        PipelineState::Processed,        // custom fields disabled
    ];
    for expected_state in expected {
        let outcome = pipeline.process_document(17, None).await.unwrap();
        assert!(matches!(outcome, PipelineOutcome::Ran(_)));
        assert_eq!(state_of(&dms, 17, &settings), expected_state);
    }

    // Quiescence: one more call reports completion.
    let outcome = pipeline.process_document(17, None).await.unwrap();
    assert!(matches!(outcome, PipelineOutcome::Completed));

    let doc = dms.document(17);
    assert_eq!(doc.title, "PayPal payment to Example Shop — December 2024");
    assert_eq!(doc.correspondent, Some(3));
    assert_eq!(doc.document_type, Some(5));
    assert!(doc.tags.contains(&12));
}

/// Scenario: the first title is rejected with feedback, the second is
/// confirmed. No pending review is created.
#[tokio::test]
async fn title_rejection_recovers_on_retry() {
    let settings = test_settings();
    let w = &settings.workflow;
    let dms = seed_dms(document(42, &["ocr_done"], w));
    let pool = setup_test_db().await;

    let large = Arc::new(ScriptedLlm::new(vec![
        ScriptedLlm::structured(json!({
            "suggested_title": "Invoice 0006",
            "reasoning": "number on the page",
            "confidence": 0.5
        })),
        ScriptedLlm::structured(json!({
            "suggested_title": "PayPal payment to Example Shop — December 2024",
            "reasoning": "merchant and period",
            "confidence": 0.9
        })),
    ]));
    let small = Arc::new(ScriptedLlm::new(vec![
        ScriptedLlm::structured(json!({
            "confirmed": false,
            "feedback": "merchant name missing",
            "suggested_changes": ""
        })),
        ScriptedLlm::structured(json!({ "confirmed": true, "feedback": "" })),
    ]));

    let deps = build_deps(dms.clone(), large, small, settings.clone(), &pool).await;
    let reviews = deps.reviews.clone();
    let pipeline = Pipeline::new(deps);

    let outcome = pipeline.process_document(42, None).await.unwrap();
    let PipelineOutcome::Ran(result) = outcome else { panic!("expected a step run") };
    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert_eq!(state_of(&dms, 42, &settings), PipelineState::TitleDone);
    assert_eq!(dms.document(42).title, "PayPal payment to Example Shop — December 2024");
    assert!(reviews.get_active(42, ReviewKind::Title).await.unwrap().is_none());
}

/// Scenario: every analysis rejected. After max retries, the title is
/// unchanged, the state does not advance, and exactly one pending review
/// of kind `title` exists with the attempt count.
#[tokio::test]
async fn exhausted_retries_queue_for_review() {
    let mut settings = test_settings();
    settings.max_retries = 3;
    let w = &settings.workflow;
    let dms = seed_dms(document(99, &["ocr_done"], w));
    let pool = setup_test_db().await;

    let large = Arc::new(ScriptedLlm::always(json!({
        "suggested_title": "Wrong title",
        "reasoning": "guesswork",
        "confidence": 0.3
    })));
    let small = Arc::new(ScriptedLlm::always(json!({
        "confirmed": false,
        "feedback": "does not match the document",
        "suggested_changes": ""
    })));

    let deps = build_deps(dms.clone(), large, small, settings.clone(), &pool).await;
    let reviews = deps.reviews.clone();
    let pipeline = Pipeline::new(deps);

    let outcome = pipeline.process_document(99, None).await.unwrap();
    let PipelineOutcome::Ran(result) = outcome else { panic!("expected a step run") };
    assert!(!result.success);
    assert!(result.needs_review);
    assert_eq!(result.attempts, 3);

    assert_eq!(dms.document(99).title, "scan_001.pdf");
    assert_eq!(state_of(&dms, 99, &settings), PipelineState::OcrDone);
    let names = dms.document_tag_names(99);
    assert!(names.iter().any(|n| n == &settings.workflow.manual_review));

    let review = reviews
        .get_active(99, ReviewKind::Title)
        .await
        .unwrap()
        .expect("pending review must exist");
    assert_eq!(review.attempts, 3);
    assert_eq!(review.kind, ReviewKind::Title);
    assert_eq!(reviews.list(Some(ReviewKind::Title)).await.unwrap().len(), 1);
}

/// Scenario: mixed new/existing tag proposals. The existing tag is applied
/// immediately, the new one is queued for review, the state advances, and
/// no manual-review flag is raised.
#[tokio::test]
async fn new_tag_proposal_is_queued_not_applied() {
    let settings = test_settings();
    let w = &settings.workflow;
    let dms = seed_dms(document(51, &["document_type_done"], w));
    dms.insert_tag(12, "Electronics");
    let pool = setup_test_db().await;

    let large = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::structured(json!({
        "suggested_tags": [
            { "name": "Warranty", "is_new": true, "relevance": 0.7 },
            { "name": "Electronics", "is_new": false, "existing_tag_id": 12, "relevance": 0.9 }
        ],
        "tags_to_remove": [],
        "reasoning": "warranty terms and shop category",
        "confidence": 0.8
    }))]));

    let deps = build_deps(
        dms.clone(),
        large,
        Arc::new(AlwaysConfirm),
        settings.clone(),
        &pool,
    )
    .await;
    let reviews = deps.reviews.clone();
    let pipeline = Pipeline::new(deps);

    let outcome = pipeline.process_document(51, None).await.unwrap();
    let PipelineOutcome::Ran(result) = outcome else { panic!("expected a step run") };
    assert!(result.success);
    assert!(result.needs_review);

    let doc = dms.document(51);
    assert!(doc.tags.contains(&12), "existing tag must be applied");
    let names = dms.document_tag_names(51);
    assert!(
        !names.iter().any(|n| n.eq_ignore_ascii_case("Warranty")),
        "new tag must not be applied"
    );
    assert_eq!(state_of(&dms, 51, &settings), PipelineState::TagsDone);
    assert!(!names.iter().any(|n| n == &settings.workflow.manual_review));

    let review = reviews
        .get_active(51, ReviewKind::Tag)
        .await
        .unwrap()
        .expect("new-tag review must exist");
    assert_eq!(review.suggestion, "Warranty");
}

/// A pinned step bypasses tag-based gating.
#[tokio::test]
async fn explicit_step_bypasses_derivation() {
    let settings = test_settings();
    let w = &settings.workflow;
    // Document already at correspondent_done; force a title re-run.
    let dms = seed_dms(document(7, &["correspondent_done"], w));
    let pool = setup_test_db().await;

    let large = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::structured(json!({
        "suggested_title": "Re-run title",
        "reasoning": "manual retry",
        "confidence": 0.9
    }))]));
    let deps = build_deps(
        dms.clone(),
        large,
        Arc::new(AlwaysConfirm),
        settings.clone(),
        &pool,
    )
    .await;
    let pipeline = Pipeline::new(deps);

    use scrivener::domain::models::PipelineStep;
    let outcome = pipeline.process_document(7, Some(PipelineStep::Title)).await.unwrap();
    let PipelineOutcome::Ran(result) = outcome else { panic!("expected a step run") };
    assert!(result.success);
    assert_eq!(dms.document(7).title, "Re-run title");
    // The transition targets title_done; the re-run moved the document
    // from correspondent_done back onto the title track.
    assert_eq!(state_of(&dms, 7, &settings), PipelineState::TitleDone);
}
