//! Data types for documents, chunks, and retrieval results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }
}

/// An immutable span of source text, identified by its position in the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the corpus; also its key in the vector index.
    pub ordinal: usize,
    /// The text content of the chunk.
    pub text: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved chunk paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// Ordinal of the chunk in the corpus.
    pub ordinal: usize,
    /// The chunk text.
    pub text: String,
    /// `1 / (1 + distance)`, in `(0, 1]`, higher is more relevant.
    pub similarity: f32,
}

/// Aggregate similarity signals of one retrieval batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RetrievalStats {
    /// Highest similarity in the batch, `0.0` when the batch is empty.
    pub max_similarity: f32,
    /// Mean similarity of the batch, `0.0` when the batch is empty.
    pub avg_similarity: f32,
    /// Number of results in the batch.
    pub count: usize,
}

impl RetrievalStats {
    /// Derive stats from a batch of retrieval results.
    pub fn from_results(results: &[RetrievalResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let max_similarity =
            results.iter().map(|r| r.similarity).fold(f32::NEG_INFINITY, f32::max);
        let sum: f32 = results.iter().map(|r| r.similarity).sum();
        Self { max_similarity, avg_similarity: sum / results.len() as f32, count: results.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(similarity: f32) -> RetrievalResult {
        RetrievalResult { ordinal: 0, text: String::new(), similarity }
    }

    #[test]
    fn stats_of_empty_batch_are_zero() {
        assert_eq!(RetrievalStats::from_results(&[]), RetrievalStats::default());
    }

    #[test]
    fn stats_report_max_and_mean() {
        let stats = RetrievalStats::from_results(&[result(0.9), result(0.5), result(0.4)]);
        assert_eq!(stats.max_similarity, 0.9);
        assert!((stats.avg_similarity - 0.6).abs() < 1e-6);
        assert_eq!(stats.count, 3);
    }
}
