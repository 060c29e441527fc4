//! Error types for the `crag-engine` crate.
//!
//! Low-confidence outcomes (out-of-scope evidence, refusals, terse answers)
//! are not errors; they are reported as [`FailureReason`](crate::FailureReason)
//! values on the [`AnswerRecord`](crate::AnswerRecord). Only precondition
//! violations and infrastructural failures surface here.

use thiserror::Error;

/// Errors that can occur in CRAG operations.
#[derive(Debug, Error)]
pub enum CragError {
    /// The question was empty or whitespace only.
    #[error("Question must not be empty")]
    EmptyQuestion,

    /// No corpus snapshot has been published yet.
    #[error("No corpus has been built; ingest documents first")]
    NoCorpus,

    /// Retrieval was attempted against a corpus with no chunks.
    #[error("Corpus is empty")]
    EmptyCorpus,

    /// A query vector does not match the index dimensionality.
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the index.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The chunk list and the vector index disagree.
    #[error("Invalid corpus: {0}")]
    InvalidCorpus(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while building or querying the vector index.
    #[error("Index error: {0}")]
    IndexError(String),

    /// The generative model failed. Fatal for the pipeline run.
    #[error("Generation error ({model}): {message}")]
    GenerationError {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The web search provider failed.
    #[error("Web search error ({provider}): {message}")]
    WebSearchError {
        /// The search provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Documents could not be loaded.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CragError {
    /// Whether this error is a caller precondition violation rather than an
    /// infrastructure failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuestion
                | Self::NoCorpus
                | Self::EmptyCorpus
                | Self::DimensionMismatch { .. }
                | Self::InvalidCorpus(_)
        )
    }
}

/// A convenience result type for CRAG operations.
pub type Result<T> = std::result::Result<T, CragError>;
