//! Property tests for the failure classifier decision table.

use crag_engine::{FailureClassifier, FailureReason, REFUSAL};
use proptest::prelude::*;

fn arb_answer() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(REFUSAL.to_string()),
        "[A-Za-z]{1,10}( [A-Za-z]{1,10}){0,15}",
        Just(String::new()),
    ]
}

/// Irrelevant evidence decides the outcome no matter what the answer says.
mod prop_out_of_scope_precedence {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn low_max_similarity_is_always_out_of_scope(
            max in 0.0f32..0.35,
            avg in 0.0f32..1.0,
            answer in arb_answer(),
        ) {
            let classifier = FailureClassifier::default();
            prop_assert_eq!(classifier.classify(max, avg, &answer), FailureReason::OutOfScope);
        }
    }
}

/// Above the threshold, the outcome depends only on the answer text.
mod prop_answer_rules {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn refusal_is_weak_context_with_relevant_evidence(
            max in 0.35f32..=1.0,
            padding in "[ \t\n]{0,3}",
        ) {
            let classifier = FailureClassifier::default();
            let answer = format!("{padding}{}{padding}", REFUSAL.to_uppercase());
            prop_assert_eq!(classifier.classify(max, max, &answer), FailureReason::WeakContext);
        }

        #[test]
        fn word_count_splits_uncertain_from_ok(
            max in 0.35f32..=1.0,
            words in proptest::collection::vec("[a-z]{1,8}", 1..20),
        ) {
            let classifier = FailureClassifier::default();
            let answer = words.join(" ");
            prop_assume!(!answer.eq_ignore_ascii_case(REFUSAL));

            let expected = if words.len() < 6 {
                FailureReason::ModelUncertain
            } else {
                FailureReason::Ok
            };
            prop_assert_eq!(classifier.classify(max, max, &answer), expected);
        }
    }
}

#[test]
fn custom_rules_are_evaluated_in_order() {
    use crag_engine::Rule;

    let classifier = FailureClassifier::with_rules(vec![
        (Rule::FewerWordsThan(3), FailureReason::ModelUncertain),
        (Rule::MaxSimilarityBelow(0.5), FailureReason::OutOfScope),
    ]);
    assert_eq!(classifier.classify(0.1, 0.1, "short"), FailureReason::ModelUncertain);
    assert_eq!(classifier.classify(0.1, 0.1, "a longer answer here"), FailureReason::OutOfScope);
    assert_eq!(classifier.classify(0.9, 0.9, "a longer answer here"), FailureReason::Ok);
}
