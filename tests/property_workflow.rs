//! Property tests for the pure core: state derivation, normalization,
//! and name similarity.

use proptest::prelude::*;

use scrivener::domain::models::{
    normalize_name, PipelineState, StepFlags, WorkflowTags,
};
use scrivener::services::bootstrap::name_similarity;

fn workflow_tag_subset() -> impl Strategy<Value = Vec<String>> {
    let w = WorkflowTags::default();
    let all: Vec<String> = w.all().iter().map(|s| s.to_string()).collect();
    proptest::sample::subsequence(all, 0..=10)
}

proptest! {
    /// Deriving the state from any tag subset always yields exactly one
    /// well-defined state, regardless of order and mixed-in content tags.
    #[test]
    fn state_derivation_is_single_valued(
        mut tags in workflow_tag_subset(),
        content_tags in proptest::collection::vec("[A-Za-z ]{1,12}", 0..5),
        seed in any::<u64>(),
    ) {
        let w = WorkflowTags::default();
        tags.extend(content_tags);

        // Order must not matter: rotate by the seed and compare.
        let baseline = PipelineState::from_tag_names(&tags, &w);
        if !tags.is_empty() {
            let rotation = (seed as usize) % tags.len();
            tags.rotate_left(rotation);
        }
        let rotated = PipelineState::from_tag_names(&tags, &w);
        prop_assert_eq!(baseline, rotated);
    }

    /// Every reachable step advances precedence strictly.
    #[test]
    fn steps_advance_monotonically(summary_enabled in any::<bool>()) {
        let flags = StepFlags { summary: summary_enabled, ..StepFlags::default() };
        let mut state = PipelineState::Pending;
        let mut hops = 0;
        while let Some(step) = state.next_step(&flags) {
            let next = step.output_state();
            prop_assert!(next.precedence() > state.precedence());
            state = next;
            hops += 1;
            prop_assert!(hops <= 8, "pipeline must terminate");
        }
        prop_assert_eq!(state, PipelineState::Processed);
    }

    /// Normalization is idempotent.
    #[test]
    fn normalize_is_idempotent(s in "\\PC{0,40}") {
        let once = normalize_name(&s);
        prop_assert_eq!(normalize_name(&once), once.clone());
        // And stable under extra whitespace.
        let padded = format!("  {s} ");
        prop_assert_eq!(normalize_name(&padded), once);
    }

    /// Similarity is symmetric, reflexive on non-empty normalized names,
    /// and bounded in [0, 1].
    #[test]
    fn similarity_bounds_and_symmetry(a in "[a-zA-Z0-9 ]{0,24}", b in "[a-zA-Z0-9 ]{0,24}") {
        let ab = name_similarity(&a, &b);
        let ba = name_similarity(&b, &a);
        prop_assert_eq!(ab, ba);
        prop_assert!((0.0..=1.0).contains(&ab));

        if !normalize_name(&a).is_empty() {
            prop_assert_eq!(name_similarity(&a, &a), 1.0);
        }
    }
}
