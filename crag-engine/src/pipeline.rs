//! CRAG pipeline orchestrator.
//!
//! The [`CragPipeline`] turns one question into an [`AnswerRecord`]:
//!
//! 1. embed the question and retrieve the top `top_k` chunks
//! 2. hallucination gate: below `gate_threshold`, go straight to the web
//! 3. generate a grounded answer from the top `context_chunks` chunks
//! 4. classify the answer
//! 5. on `WEAK_CONTEXT` / `MODEL_UNCERTAIN`, retry once at `retry_k` with
//!    every retrieved chunk as context and keep the retry only if it is `OK`
//! 6. resolve: `OK` → documents, `OUT_OF_SCOPE` → web, otherwise the
//!    original answer as a low-confidence document answer
//!
//! # Example
//!
//! ```rust,ignore
//! use crag_engine::{CragConfig, CragPipeline, HashingEmbedder};
//!
//! let pipeline = CragPipeline::builder()
//!     .config(CragConfig::default())
//!     .embedder(Arc::new(HashingEmbedder::default()))
//!     .model(Arc::new(my_model))
//!     .web_search(Arc::new(my_search))
//!     .build()?;
//!
//! let record = pipeline.answer(&corpus, "What is Chichen Itza?").await?;
//! println!("{} ({})", record.answer, record.source);
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classifier::{FailureClassifier, FailureReason};
use crate::config::CragConfig;
use crate::corpus::{Corpus, CorpusSlot};
use crate::document::{RetrievalResult, RetrievalStats};
use crate::embedding::Embedder;
use crate::error::{CragError, Result};
use crate::generator::{AnswerGenerator, GenerativeModel};
use crate::record::{AnswerRecord, AnswerSource, Confidence, Transition};
use crate::retriever::retrieve;
use crate::web::{WebFallback, WebSearchProvider};

/// One grounded generation and its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// Generated answer text.
    pub answer: String,
    /// Classification of the answer.
    pub reason: FailureReason,
}

/// Result of weighing a retry against the original attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// The retry is `OK` and replaces the original.
    Adopted(Attempt),
    /// The retry is not `OK`; the original stands unchanged.
    Discarded {
        /// The original attempt.
        original: Attempt,
        /// How the dropped retry was classified.
        retry_reason: FailureReason,
    },
}

impl RetryDecision {
    /// The attempt that stands after the decision.
    pub fn into_attempt(self) -> Attempt {
        match self {
            Self::Adopted(attempt) | Self::Discarded { original: attempt, .. } => attempt,
        }
    }
}

/// Keep the retry only when it classifies as `OK`; never merge the two.
pub fn choose_attempt(original: Attempt, retry: Attempt) -> RetryDecision {
    if retry.reason == FailureReason::Ok {
        RetryDecision::Adopted(retry)
    } else {
        RetryDecision::Discarded { original, retry_reason: retry.reason }
    }
}

/// Join chunk texts into a prompt context, separated by blank lines.
fn build_context(results: &[RetrievalResult], limit: usize) -> String {
    results.iter().take(limit).map(|r| r.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// The CRAG decision pipeline.
///
/// Holds no corpus: every call takes the snapshot to answer against, so
/// ingestion and querying only meet through an explicit `&Corpus`.
/// Construct one via [`CragPipeline::builder()`].
pub struct CragPipeline {
    config: CragConfig,
    embedder: Arc<dyn Embedder>,
    generator: AnswerGenerator,
    classifier: FailureClassifier,
    web: WebFallback,
}

impl CragPipeline {
    /// Create a new [`CragPipelineBuilder`].
    pub fn builder() -> CragPipelineBuilder {
        CragPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &CragConfig {
        &self.config
    }

    /// Return a reference to the classifier in use.
    pub fn classifier(&self) -> &FailureClassifier {
        &self.classifier
    }

    /// Answer against whatever snapshot `slot` currently holds.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::EmptyQuestion`] before touching the slot, then
    /// [`CragError::NoCorpus`] if nothing has been published.
    pub async fn answer_current(&self, slot: &CorpusSlot, question: &str) -> Result<AnswerRecord> {
        if question.trim().is_empty() {
            return Err(CragError::EmptyQuestion);
        }
        let corpus = slot.current().await?;
        self.answer(&corpus, question).await
    }

    /// Run the full pipeline for one question against one corpus snapshot.
    ///
    /// # Errors
    ///
    /// - [`CragError::EmptyQuestion`] for a blank question
    /// - [`CragError::DimensionMismatch`] if the embedder and index disagree
    /// - embedding and generation failures, which end the run
    ///
    /// Low-confidence outcomes are never errors; they are recorded in the
    /// returned [`AnswerRecord`].
    pub async fn answer(&self, corpus: &Corpus, question: &str) -> Result<AnswerRecord> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CragError::EmptyQuestion);
        }

        let mut run = Run::new(corpus, question);
        info!(
            run.id = %run.id,
            corpus.id = %corpus.id(),
            chunk_count = corpus.len(),
            "answering question"
        );

        if corpus.is_empty() {
            run.trace.push(Transition::Gated {
                max_similarity: 0.0,
                threshold: self.config.gate_threshold,
                passed: false,
            });
            info!(run.id = %run.id, "corpus has no chunks; using web");
            return self.resolve_web(run, FailureReason::OutOfScope).await;
        }

        let query = self.embedder.embed(question).await.map_err(|e| {
            error!(run.id = %run.id, error = %e, "question embedding failed");
            e
        })?;

        // A zero vector carries no signal; its distances say nothing about relevance.
        if query.iter().all(|x| *x == 0.0) {
            run.trace.push(Transition::Gated {
                max_similarity: 0.0,
                threshold: self.config.gate_threshold,
                passed: false,
            });
            info!(run.id = %run.id, "question has no embeddable content; using web");
            return self.resolve_web(run, FailureReason::OutOfScope).await;
        }

        // START → RETRIEVED
        let results = retrieve(&query, corpus, self.config.top_k)?;
        let stats = RetrievalStats::from_results(&results);
        info!(
            run.id = %run.id,
            k = self.config.top_k,
            max_similarity = stats.max_similarity,
            avg_similarity = stats.avg_similarity,
            "retrieved chunks"
        );
        run.trace.push(Transition::Retrieved { attempt: 0, k: self.config.top_k, stats });
        run.stats = stats;
        run.retrieved = results;

        // RETRIEVED → GATED
        let passed = stats.max_similarity >= self.config.gate_threshold;
        run.trace.push(Transition::Gated {
            max_similarity: stats.max_similarity,
            threshold: self.config.gate_threshold,
            passed,
        });
        if !passed {
            info!(run.id = %run.id, "below hallucination gate; skipping document generation");
            return self.resolve_web(run, FailureReason::OutOfScope).await;
        }

        // GATED → ANSWERED → CLASSIFIED
        let context_chunks = self.config.context_chunks.min(run.retrieved.len());
        let context = build_context(&run.retrieved, context_chunks);
        let mut attempt = self.attempt(question, &context, stats).await?;
        run.trace.push(Transition::Answered { attempt: 0, context_chunks });
        run.trace.push(Transition::Classified { attempt: 0, reason: attempt.reason });
        debug!(run.id = %run.id, reason = %attempt.reason, "classified first attempt");

        // RETRY → RE-ANSWERED → RE-CLASSIFIED
        if attempt.reason.is_retryable() && run.retries_used < self.config.max_retries {
            run.retries_used += 1;
            let k = self.config.retry_k;
            warn!(
                run.id = %run.id,
                reason = %attempt.reason,
                k,
                "weak answer; retrying with more evidence"
            );
            run.trace.push(Transition::Retried { k });

            let retry_results = retrieve(&query, corpus, k)?;
            let retry_stats = RetrievalStats::from_results(&retry_results);
            run.trace.push(Transition::Retrieved { attempt: 1, k, stats: retry_stats });

            let retry_context = build_context(&retry_results, retry_results.len());
            let retry = self.attempt(question, &retry_context, retry_stats).await?;
            run.trace
                .push(Transition::Answered { attempt: 1, context_chunks: retry_results.len() });
            run.trace.push(Transition::Classified { attempt: 1, reason: retry.reason });
            run.retry_retrieved = retry_results;

            let decision = choose_attempt(attempt, retry);
            run.trace.push(match &decision {
                RetryDecision::Adopted(_) => Transition::RetryAdopted,
                RetryDecision::Discarded { retry_reason, .. } => {
                    Transition::RetryDiscarded { retry_reason: *retry_reason }
                }
            });
            attempt = decision.into_attempt();
        }

        // → RESOLVED
        match attempt.reason {
            FailureReason::Ok => Ok(run.finish(
                attempt.answer,
                AnswerSource::Documents,
                Confidence::High,
                attempt.reason,
            )),
            FailureReason::OutOfScope => {
                info!(run.id = %run.id, "answer out of scope; discarding for web");
                self.resolve_web(run, FailureReason::OutOfScope).await
            }
            FailureReason::WeakContext | FailureReason::ModelUncertain => {
                warn!(
                    run.id = %run.id,
                    reason = %attempt.reason,
                    "surfacing low-confidence answer"
                );
                Ok(run.finish(
                    attempt.answer,
                    AnswerSource::Documents,
                    Confidence::Low,
                    attempt.reason,
                ))
            }
        }
    }

    async fn attempt(
        &self,
        question: &str,
        context: &str,
        stats: RetrievalStats,
    ) -> Result<Attempt> {
        let answer = self.generator.generate_grounded(question, context).await?;
        let reason = self.classifier.classify(stats.max_similarity, stats.avg_similarity, &answer);
        Ok(Attempt { answer, reason })
    }

    async fn resolve_web(&self, mut run: Run<'_>, reason: FailureReason) -> Result<AnswerRecord> {
        let web = self.web.answer(run.question, &self.generator).await?;
        run.trace.push(Transition::WebFallback { snippets_found: web.snippets_found });
        Ok(run.finish(web.answer, AnswerSource::Web, Confidence::Low, reason))
    }
}

/// Mutable state of one pipeline run.
struct Run<'a> {
    id: Uuid,
    corpus_id: Uuid,
    question: &'a str,
    stats: RetrievalStats,
    retrieved: Vec<RetrievalResult>,
    retry_retrieved: Vec<RetrievalResult>,
    retries_used: usize,
    trace: Vec<Transition>,
}

impl<'a> Run<'a> {
    fn new(corpus: &Corpus, question: &'a str) -> Self {
        Self {
            id: Uuid::new_v4(),
            corpus_id: corpus.id(),
            question,
            stats: RetrievalStats::default(),
            retrieved: Vec::new(),
            retry_retrieved: Vec::new(),
            retries_used: 0,
            trace: Vec::new(),
        }
    }

    fn finish(
        mut self,
        answer: String,
        source: AnswerSource,
        confidence: Confidence,
        reason: FailureReason,
    ) -> AnswerRecord {
        self.trace.push(Transition::Resolved { source, reason });
        info!(run.id = %self.id, %source, %reason, retries_used = self.retries_used, "resolved");
        AnswerRecord {
            run_id: self.id,
            corpus_id: self.corpus_id,
            created_at: Utc::now(),
            question: self.question.to_string(),
            answer,
            source,
            confidence,
            failure_reason: reason,
            retries_used: self.retries_used,
            stats: self.stats,
            retrieved_chunks: self.retrieved,
            retry_chunks: self.retry_retrieved,
            trace: self.trace,
        }
    }
}

/// Builder for constructing a [`CragPipeline`].
///
/// `embedder`, `model` and `web_search` are required. The configuration
/// defaults to [`CragConfig::default`] and the classifier is derived from it
/// unless one is set explicitly.
#[derive(Default)]
pub struct CragPipelineBuilder {
    config: Option<CragConfig>,
    embedder: Option<Arc<dyn Embedder>>,
    model: Option<Arc<dyn GenerativeModel>>,
    web_search: Option<Arc<dyn WebSearchProvider>>,
    classifier: Option<FailureClassifier>,
}

impl CragPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CragConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedder used for questions. Must match the corpus embedder.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the generative model.
    pub fn model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the web search provider.
    pub fn web_search(mut self, search: Arc<dyn WebSearchProvider>) -> Self {
        self.web_search = Some(search);
        self
    }

    /// Override the classifier decision table.
    pub fn classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Build the [`CragPipeline`], validating configuration and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::ConfigError`] if a required field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<CragPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedder = self
            .embedder
            .ok_or_else(|| CragError::ConfigError("embedder is required".to_string()))?;
        let model =
            self.model.ok_or_else(|| CragError::ConfigError("model is required".to_string()))?;
        let web_search = self
            .web_search
            .ok_or_else(|| CragError::ConfigError("web_search is required".to_string()))?;

        if config.gate_threshold < config.out_of_scope_threshold {
            warn!(
                gate_threshold = config.gate_threshold,
                out_of_scope_threshold = config.out_of_scope_threshold,
                "gate is looser than the classifier's out-of-scope threshold"
            );
        }

        let classifier = self.classifier.unwrap_or_else(|| FailureClassifier::from_config(&config));
        let generator = AnswerGenerator::new(model, &config);

        Ok(CragPipeline {
            config,
            embedder,
            generator,
            classifier,
            web: WebFallback::new(web_search),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(answer: &str, reason: FailureReason) -> Attempt {
        Attempt { answer: answer.to_string(), reason }
    }

    #[test]
    fn ok_retry_replaces_original() {
        let original = attempt("I don't know", FailureReason::WeakContext);
        let retry = attempt("Chichen Itza is a large Maya city.", FailureReason::Ok);
        let decision = choose_attempt(original, retry.clone());
        assert_eq!(decision, RetryDecision::Adopted(retry.clone()));
        assert_eq!(decision.into_attempt(), retry);
    }

    #[test]
    fn failed_retry_keeps_original() {
        let original = attempt("Maya", FailureReason::ModelUncertain);
        let retry = attempt("I don't know", FailureReason::WeakContext);
        let decision = choose_attempt(original.clone(), retry);
        assert_eq!(
            decision,
            RetryDecision::Discarded {
                original: original.clone(),
                retry_reason: FailureReason::WeakContext
            }
        );
        assert_eq!(decision.into_attempt(), original);
    }

    #[test]
    fn context_joins_with_blank_lines_and_respects_limit() {
        let results: Vec<RetrievalResult> = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(ordinal, text)| RetrievalResult {
                ordinal,
                text: text.to_string(),
                similarity: 0.5,
            })
            .collect();
        assert_eq!(build_context(&results, 2), "a\n\nb");
        assert_eq!(build_context(&results, 10), "a\n\nb\n\nc");
    }
}
