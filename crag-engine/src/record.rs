//! The explainability record produced by every pipeline run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::FailureReason;
use crate::document::{RetrievalResult, RetrievalStats};

/// Evidence that backs the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// The user's documents.
    Documents,
    /// Open-web snippets.
    Web,
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Documents => f.write_str("documents"),
            Self::Web => f.write_str("web"),
        }
    }
}

/// How far the final answer can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Document-grounded answer classified `OK`.
    High,
    /// Surfaced despite a failed classification, or taken from the web.
    Low,
}

/// One step of the decision path, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Transition {
    /// Chunks were retrieved for attempt `attempt` (0 = first, 1 = retry).
    Retrieved { attempt: usize, k: usize, stats: RetrievalStats },
    /// The hallucination gate was evaluated.
    Gated { max_similarity: f32, threshold: f32, passed: bool },
    /// A grounded answer was generated from `context_chunks` chunks.
    Answered { attempt: usize, context_chunks: usize },
    /// An answer was classified.
    Classified { attempt: usize, reason: FailureReason },
    /// A wider retry was started.
    Retried { k: usize },
    /// The retry answer replaced the original.
    RetryAdopted,
    /// The retry answer was dropped; the original stands.
    RetryDiscarded { retry_reason: FailureReason },
    /// The web fallback ran.
    WebFallback { snippets_found: bool },
    /// The run finished.
    Resolved { source: AnswerSource, reason: FailureReason },
}

/// Everything needed to explain how one question was answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Snapshot the question was answered against.
    pub corpus_id: Uuid,
    /// When the run finished.
    pub created_at: DateTime<Utc>,
    /// The question as asked.
    pub question: String,
    /// The final answer text.
    pub answer: String,
    /// Evidence behind the final answer.
    pub source: AnswerSource,
    /// Trust level of the final answer.
    pub confidence: Confidence,
    /// Final classification.
    pub failure_reason: FailureReason,
    /// Retries consumed (0 or 1).
    pub retries_used: usize,
    /// Stats of the first retrieval.
    pub stats: RetrievalStats,
    /// Chunks of the first retrieval, most similar first.
    pub retrieved_chunks: Vec<RetrievalResult>,
    /// Chunks of the retry retrieval; empty when no retry ran.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry_chunks: Vec<RetrievalResult>,
    /// Ordered decision path.
    pub trace: Vec<Transition>,
}

impl AnswerRecord {
    /// Whether the answer is grounded in the user's documents.
    pub fn is_grounded(&self) -> bool {
        self.source == AnswerSource::Documents
    }

    /// The compact decision summary shown to users.
    pub fn decision_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "failure_reason": self.failure_reason,
            "retries_used": self.retries_used,
            "answer_source": self.source,
            "confidence": self.confidence,
        })
    }
}
