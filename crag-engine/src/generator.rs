//! Answer generation in document-grounded or web mode.
//!
//! [`GenerativeModel`] is the raw text-in/text-out capability;
//! [`AnswerGenerator`] owns the prompts and the terseness guard.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::classifier::{REFUSAL, word_count};
use crate::config::CragConfig;
use crate::error::Result;

/// Which evidence the prompt is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Context comes from the user's documents.
    Grounded,
    /// Context comes from open-web snippets.
    Web,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grounded => f.write_str("documents"),
            Self::Web => f.write_str("web"),
        }
    }
}

/// A single prompt sent to a [`GenerativeModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Full prompt text.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
    /// Mode the prompt was built for.
    pub mode: GenerationMode,
}

/// A text generation backend.
///
/// Implementations must decode greedily (no sampling) so that repeated calls
/// with the same request return the same text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for the request.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::GenerationError`](crate::CragError::GenerationError)
    /// on backend failure.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

const COPULAS: [&str; 3] = [" is ", " was ", " are "];

/// Builds prompts and applies answer post-processing around a model.
pub struct AnswerGenerator {
    model: Arc<dyn GenerativeModel>,
    guard_min_words: usize,
    grounded_max_tokens: u32,
    web_max_tokens: u32,
}

impl AnswerGenerator {
    /// Create a generator with limits taken from `config`.
    pub fn new(model: Arc<dyn GenerativeModel>, config: &CragConfig) -> Self {
        Self {
            model,
            guard_min_words: config.guard_min_words,
            grounded_max_tokens: config.grounded_max_tokens,
            web_max_tokens: config.web_max_tokens,
        }
    }

    /// The underlying model.
    pub fn model(&self) -> &Arc<dyn GenerativeModel> {
        &self.model
    }

    /// Answer from document context only.
    ///
    /// Terse fragments without a copula are replaced by [`REFUSAL`].
    pub async fn generate_grounded(&self, question: &str, context: &str) -> Result<String> {
        let request = GenerationRequest {
            prompt: grounded_prompt(question, context),
            max_output_tokens: self.grounded_max_tokens,
            mode: GenerationMode::Grounded,
        };
        let answer = self.run(request).await?;

        if is_fragment(&answer, self.guard_min_words) {
            debug!(answer = %answer, "terse fragment replaced by refusal");
            return Ok(REFUSAL.to_string());
        }
        Ok(answer)
    }

    /// Answer from web snippets. No post-filtering is applied.
    pub async fn generate_web(&self, question: &str, web_context: &str) -> Result<String> {
        let request = GenerationRequest {
            prompt: web_prompt(question, web_context),
            max_output_tokens: self.web_max_tokens,
            mode: GenerationMode::Web,
        };
        self.run(request).await
    }

    async fn run(&self, request: GenerationRequest) -> Result<String> {
        let mode = request.mode;
        info!(model = self.model.name(), %mode, "generating answer");

        let answer = self.model.generate(request).await.map_err(|e| {
            error!(model = self.model.name(), %mode, error = %e, "generation failed");
            e
        })?;
        Ok(answer.trim().to_string())
    }
}

/// Short answer with no sentence-forming verb, e.g. a bare noun phrase.
fn is_fragment(answer: &str, min_words: usize) -> bool {
    let lowered = answer.to_lowercase();
    word_count(answer) < min_words && !COPULAS.iter().any(|verb| lowered.contains(verb))
}

fn grounded_prompt(question: &str, context: &str) -> String {
    format!(
        "Using ONLY the information in the context below, answer the question.\n\
         You may combine relevant facts from different parts of the context.\n\
         If the context does not contain enough information, say \"{REFUSAL}\".\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:"
    )
}

fn web_prompt(question: &str, web_context: &str) -> String {
    format!(
        "Using ONLY the web information below, answer the question.\n\
         This answer is NOT based on uploaded documents.\n\n\
         Web Information:\n{web_context}\n\n\
         Question:\n{question}\n\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_noun_phrase_is_a_fragment() {
        assert!(is_fragment("Paris", 5));
        assert!(is_fragment("the Maya people", 5));
    }

    #[test]
    fn short_sentence_with_copula_is_kept() {
        assert!(!is_fragment("Paris is the capital", 5));
        assert!(!is_fragment("Both ARE here", 5));
    }

    #[test]
    fn long_answer_is_never_a_fragment() {
        assert!(!is_fragment("Built by the Maya people long ago", 5));
    }

    #[test]
    fn grounded_prompt_carries_context_and_refusal() {
        let prompt = grounded_prompt("What is X?", "X is Y.");
        assert!(prompt.contains("Context:\nX is Y."));
        assert!(prompt.contains("\"I don't know\""));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn web_prompt_disclaims_documents() {
        let prompt = web_prompt("What is X?", "snippet");
        assert!(prompt.contains("NOT based on uploaded documents"));
        assert!(prompt.contains("Web Information:\nsnippet"));
    }
}
