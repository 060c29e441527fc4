//! Failure classification of a generated answer.
//!
//! The classifier is a decision table evaluated top to bottom; the first rule
//! that matches decides the outcome. Thresholds live in the rules, not in the
//! control flow, so they can be tuned and tested in isolation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CragConfig;

/// The canonical refusal emitted when context is insufficient.
pub const REFUSAL: &str = "I don't know";

/// Outcome category of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The answer can be trusted as document-grounded.
    Ok,
    /// The retrieved evidence is irrelevant to the question.
    OutOfScope,
    /// The model declined to answer from the context.
    WeakContext,
    /// The answer is suspiciously terse.
    ModelUncertain,
}

impl FailureReason {
    /// Whether a wider retrieval retry may fix this outcome.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::WeakContext | Self::ModelUncertain)
    }

    /// The wire name, e.g. `OUT_OF_SCOPE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::OutOfScope => "OUT_OF_SCOPE",
            Self::WeakContext => "WEAK_CONTEXT",
            Self::ModelUncertain => "MODEL_UNCERTAIN",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition over retrieval signals and answer text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// Maximum similarity strictly below the threshold.
    MaxSimilarityBelow(f32),
    /// Answer equals the refusal, ignoring case and surrounding whitespace.
    Refusal,
    /// Answer has fewer whitespace-separated words than the bound.
    FewerWordsThan(usize),
}

impl Rule {
    fn matches(&self, max_similarity: f32, _avg_similarity: f32, answer: &str) -> bool {
        match self {
            Self::MaxSimilarityBelow(threshold) => max_similarity < *threshold,
            Self::Refusal => is_refusal(answer),
            Self::FewerWordsThan(bound) => word_count(answer) < *bound,
        }
    }
}

/// Whether `answer` is the canonical refusal.
pub fn is_refusal(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(REFUSAL)
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First-match-wins decision table mapping signals to a [`FailureReason`].
///
/// # Example
///
/// ```rust,ignore
/// use crag_engine::{FailureClassifier, FailureReason};
///
/// let classifier = FailureClassifier::default();
/// assert_eq!(classifier.classify(0.9, 0.9, "Paris"), FailureReason::ModelUncertain);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureClassifier {
    rules: Vec<(Rule, FailureReason)>,
}

impl FailureClassifier {
    /// Build the standard table from explicit thresholds.
    pub fn new(out_of_scope_threshold: f32, min_answer_words: usize) -> Self {
        Self {
            rules: vec![
                (Rule::MaxSimilarityBelow(out_of_scope_threshold), FailureReason::OutOfScope),
                (Rule::Refusal, FailureReason::WeakContext),
                (Rule::FewerWordsThan(min_answer_words), FailureReason::ModelUncertain),
            ],
        }
    }

    /// Build the standard table from pipeline configuration.
    pub fn from_config(config: &CragConfig) -> Self {
        Self::new(config.out_of_scope_threshold, config.min_answer_words)
    }

    /// Build a classifier from a custom ordered rule list.
    pub fn with_rules(rules: Vec<(Rule, FailureReason)>) -> Self {
        Self { rules }
    }

    /// The ordered rule list.
    pub fn rules(&self) -> &[(Rule, FailureReason)] {
        &self.rules
    }

    /// Classify an answer; [`FailureReason::Ok`] when no rule matches.
    pub fn classify(
        &self,
        max_similarity: f32,
        avg_similarity: f32,
        answer: &str,
    ) -> FailureReason {
        self.rules
            .iter()
            .find(|(rule, _)| rule.matches(max_similarity, avg_similarity, answer))
            .map(|(_, outcome)| *outcome)
            .unwrap_or(FailureReason::Ok)
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::from_config(&CragConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irrelevant_evidence_wins_over_answer_text() {
        let c = FailureClassifier::default();
        assert_eq!(c.classify(0.2, 0.2, "anything"), FailureReason::OutOfScope);
        assert_eq!(c.classify(0.2, 0.2, REFUSAL), FailureReason::OutOfScope);
    }

    #[test]
    fn refusal_is_weak_context() {
        let c = FailureClassifier::default();
        assert_eq!(c.classify(0.9, 0.9, "I don't know"), FailureReason::WeakContext);
        assert_eq!(c.classify(0.9, 0.9, "  i DON'T know \n"), FailureReason::WeakContext);
    }

    #[test]
    fn terse_answer_is_model_uncertain() {
        let c = FailureClassifier::default();
        assert_eq!(c.classify(0.9, 0.9, "Paris"), FailureReason::ModelUncertain);
        assert_eq!(c.classify(0.9, 0.9, "It is in Paris, France"), FailureReason::ModelUncertain);
    }

    #[test]
    fn full_sentence_is_ok() {
        let c = FailureClassifier::default();
        assert_eq!(c.classify(0.9, 0.9, "The capital of France is Paris."), FailureReason::Ok);
    }

    #[test]
    fn threshold_is_strict() {
        let c = FailureClassifier::new(0.35, 6);
        assert_eq!(c.classify(0.35, 0.1, "The capital of France is Paris."), FailureReason::Ok);
    }

    #[test]
    fn only_weak_context_and_uncertain_are_retryable() {
        assert!(FailureReason::WeakContext.is_retryable());
        assert!(FailureReason::ModelUncertain.is_retryable());
        assert!(!FailureReason::Ok.is_retryable());
        assert!(!FailureReason::OutOfScope.is_retryable());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&FailureReason::ModelUncertain).unwrap();
        assert_eq!(json, "\"MODEL_UNCERTAIN\"");
    }
}
