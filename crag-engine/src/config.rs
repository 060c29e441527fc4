//! Configuration for the CRAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{CragError, Result};

/// Configuration parameters for ingestion and the CRAG decision pipeline.
///
/// `gate_threshold` and `out_of_scope_threshold` are deliberately separate:
/// the gate decides whether grounded generation is attempted at all, the
/// classifier threshold decides whether a generated answer is discarded in
/// favour of the web.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CragConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Retrieval width of the first attempt.
    pub top_k: usize,
    /// Retrieval width of the retry attempt.
    pub retry_k: usize,
    /// Retry budget per question: `0` disables the retry, `1` allows one.
    pub max_retries: usize,
    /// Hard hallucination gate on the maximum similarity.
    pub gate_threshold: f32,
    /// Number of top chunks that form the first attempt's context.
    pub context_chunks: usize,
    /// Classifier threshold below which evidence is out of scope.
    pub out_of_scope_threshold: f32,
    /// Answers with fewer words are classified as model-uncertain.
    pub min_answer_words: usize,
    /// Grounded answers with fewer words and no copula become a refusal.
    pub guard_min_words: usize,
    /// Output token cap for grounded generation.
    pub grounded_max_tokens: u32,
    /// Output token cap for web generation.
    pub web_max_tokens: u32,
    /// Maximum number of web snippets to keep.
    pub web_max_results: usize,
}

impl Default for CragConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
            top_k: 3,
            retry_k: 6,
            max_retries: 1,
            gate_threshold: 0.45,
            context_chunks: 2,
            out_of_scope_threshold: 0.35,
            min_answer_words: 6,
            guard_min_words: 5,
            grounded_max_tokens: 90,
            web_max_tokens: 120,
            web_max_results: 5,
        }
    }
}

impl CragConfig {
    /// Create a new builder for constructing a [`CragConfig`].
    pub fn builder() -> CragConfigBuilder {
        CragConfigBuilder::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CragConfig = serde_json::from_str(json)
            .map_err(|e| CragError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `retry_k < top_k`
    /// - `context_chunks == 0`
    /// - `max_retries > 1`
    /// - either threshold lies outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(CragError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(CragError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.retry_k < self.top_k {
            return Err(CragError::ConfigError(format!(
                "retry_k ({}) must not be smaller than top_k ({})",
                self.retry_k, self.top_k
            )));
        }
        if self.context_chunks == 0 {
            return Err(CragError::ConfigError(
                "context_chunks must be greater than zero".to_string(),
            ));
        }
        if self.max_retries > 1 {
            return Err(CragError::ConfigError(format!(
                "max_retries ({}) must be 0 or 1; a repeated retry would see identical evidence",
                self.max_retries
            )));
        }
        for (name, value) in [
            ("gate_threshold", self.gate_threshold),
            ("out_of_scope_threshold", self.out_of_scope_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CragError::ConfigError(format!(
                    "{name} ({value}) must lie within [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`CragConfig`].
#[derive(Debug, Clone, Default)]
pub struct CragConfigBuilder {
    config: CragConfig,
}

impl CragConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the retrieval width of the first attempt.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the retrieval width of the retry attempt.
    pub fn retry_k(mut self, k: usize) -> Self {
        self.config.retry_k = k;
        self
    }

    /// Set the retry budget. Zero disables retries.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the hard hallucination gate.
    pub fn gate_threshold(mut self, threshold: f32) -> Self {
        self.config.gate_threshold = threshold;
        self
    }

    /// Set how many top chunks form the first attempt's context.
    pub fn context_chunks(mut self, n: usize) -> Self {
        self.config.context_chunks = n;
        self
    }

    /// Set the classifier's out-of-scope threshold.
    pub fn out_of_scope_threshold(mut self, threshold: f32) -> Self {
        self.config.out_of_scope_threshold = threshold;
        self
    }

    /// Set the minimum word count of a confident answer.
    pub fn min_answer_words(mut self, words: usize) -> Self {
        self.config.min_answer_words = words;
        self
    }

    /// Set the word count below which the terseness guard applies.
    pub fn guard_min_words(mut self, words: usize) -> Self {
        self.config.guard_min_words = words;
        self
    }

    /// Set the output token caps for grounded and web generation.
    pub fn max_tokens(mut self, grounded: u32, web: u32) -> Self {
        self.config.grounded_max_tokens = grounded;
        self.config.web_max_tokens = web;
        self
    }

    /// Set the maximum number of web snippets to keep.
    pub fn web_max_results(mut self, n: usize) -> Self {
        self.config.web_max_results = n;
        self
    }

    /// Build the [`CragConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`CragConfig::validate`].
    pub fn build(self) -> Result<CragConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CragConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_k, 3);
        assert_eq!(config.retry_k, 6);
        assert!(config.gate_threshold > config.out_of_scope_threshold);
    }

    #[test]
    fn rejects_retry_narrower_than_first_attempt() {
        let err = CragConfig::builder().top_k(5).retry_k(4).build().unwrap_err();
        assert!(matches!(err, CragError::ConfigError(_)));
    }

    #[test]
    fn rejects_more_than_one_retry() {
        assert!(CragConfig::builder().max_retries(2).build().is_err());
        assert!(CragConfig::builder().max_retries(0).build().is_ok());
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        assert!(CragConfig::builder().gate_threshold(1.5).build().is_err());
        assert!(CragConfig::builder().out_of_scope_threshold(-0.1).build().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CragConfig::from_json(r#"{ "gate_threshold": 0.5 }"#).unwrap();
        assert_eq!(config.gate_threshold, 0.5);
        assert_eq!(config.top_k, 3);
    }
}
