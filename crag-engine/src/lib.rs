//! # crag-engine
//!
//! Failure-aware corrective retrieval-augmented generation.
//!
//! A question is answered from the user's documents only when the evidence
//! supports it. Every run passes through a hallucination gate, a rule-based
//! failure classifier, at most one wider retrieval retry and, for irrelevant
//! evidence, an open-web fallback. The result is an [`AnswerRecord`] that
//! explains which path was taken and why.
//!
//! ## Features
//!
//! - `openai` – [`openai::OpenAIEmbedder`] and [`openai::OpenAIChatModel`]
//!   for the OpenAI API or any compatible server
//! - `web` – [`duckduckgo::DuckDuckGoSearch`], a snippet search over the
//!   DuckDuckGo HTML endpoint
//! - `full` – both of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crag_engine::{
//!     CorpusSlot, CragPipeline, DirectoryLoader, HashingEmbedder, Ingestor,
//!     RecursiveChunker,
//! };
//!
//! let embedder = Arc::new(HashingEmbedder::default());
//! let ingestor = Ingestor::new(embedder.clone(), Arc::new(RecursiveChunker::default()));
//! let slot = CorpusSlot::new();
//! slot.publish(ingestor.build_from(&DirectoryLoader::new(), "docs".as_ref()).await?).await;
//!
//! let pipeline = CragPipeline::builder()
//!     .embedder(embedder)
//!     .model(Arc::new(my_model))
//!     .web_search(Arc::new(my_search))
//!     .build()?;
//!
//! let record = pipeline.answer_current(&slot, "What is Chichen Itza?").await?;
//! println!("{}\n{}", record.answer, record.decision_summary());
//! ```

pub mod chunking;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod retriever;
pub mod web;

#[cfg(feature = "web")]
pub mod duckduckgo;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, RecursiveChunker};
pub use classifier::{FailureClassifier, FailureReason, REFUSAL, Rule};
pub use config::{CragConfig, CragConfigBuilder};
pub use corpus::{Corpus, CorpusSlot, Ingestor};
pub use document::{Chunk, Document, RetrievalResult, RetrievalStats};
pub use embedding::{Embedder, HashingEmbedder};
pub use error::{CragError, Result};
pub use generator::{AnswerGenerator, GenerationMode, GenerationRequest, GenerativeModel};
pub use index::{FlatL2Index, Neighbor, VectorIndex};
pub use loader::{DirectoryLoader, DocumentLoader};
pub use pipeline::{Attempt, CragPipeline, CragPipelineBuilder, RetryDecision, choose_attempt};
pub use record::{AnswerRecord, AnswerSource, Confidence, Transition};
pub use retriever::{retrieve, similarity_from_distance};
pub use web::{NO_INFORMATION, WebAnswer, WebFallback, WebSearchProvider};

#[cfg(feature = "web")]
pub use duckduckgo::DuckDuckGoSearch;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbedder};
