//! Corpus snapshots and ingestion.
//!
//! A [`Corpus`] is an immutable snapshot: an ordered chunk list and a vector
//! index keyed by the same ordinals. Ingestion never mutates a corpus; the
//! [`Ingestor`] builds a fresh one and [`CorpusSlot::publish`] swaps it in
//! wholesale. Queries hold an `Arc<Corpus>` for the whole pipeline run, so a
//! concurrent publish cannot change the evidence under a running question.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::chunking::Chunker;
use crate::document::{Chunk, Document};
use crate::embedding::Embedder;
use crate::error::{CragError, Result};
use crate::index::{FlatL2Index, VectorIndex};
use crate::loader::DocumentLoader;

/// An immutable set of chunks with a parallel vector index.
///
/// Invariant: `chunks().len() == index.size()` and each chunk's ordinal is its
/// position. An empty corpus has no index.
#[derive(Debug)]
pub struct Corpus {
    id: Uuid,
    created_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
    index: Option<Box<dyn VectorIndex>>,
}

impl Corpus {
    /// Assemble a corpus from chunks and an index built over their embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::InvalidCorpus`] if the chunk count differs from the
    /// index size or a chunk's ordinal is not its position.
    pub fn new(chunks: Vec<Chunk>, index: Box<dyn VectorIndex>) -> Result<Self> {
        if chunks.len() != index.size() {
            return Err(CragError::InvalidCorpus(format!(
                "{} chunks but {} indexed vectors",
                chunks.len(),
                index.size()
            )));
        }
        if let Some((position, chunk)) =
            chunks.iter().enumerate().find(|(position, chunk)| chunk.ordinal != *position)
        {
            return Err(CragError::InvalidCorpus(format!(
                "chunk at position {position} has ordinal {}",
                chunk.ordinal
            )));
        }
        let index = if chunks.is_empty() { None } else { Some(index) };
        Ok(Self { id: Uuid::new_v4(), created_at: Utc::now(), chunks, index })
    }

    /// A corpus with no chunks, e.g. after ingesting documents without text.
    pub fn empty() -> Self {
        Self { id: Uuid::new_v4(), created_at: Utc::now(), chunks: Vec::new(), index: None }
    }

    /// Snapshot identifier, fresh for every build.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the snapshot was built.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// All chunks in ordinal order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The chunk at `ordinal`, if any.
    pub fn chunk(&self, ordinal: usize) -> Option<&Chunk> {
        self.chunks.get(ordinal)
    }

    /// The vector index, absent for an empty corpus.
    pub fn index(&self) -> Option<&dyn VectorIndex> {
        self.index.as_deref()
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the corpus has no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Builds corpus snapshots: chunk → embed → index.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    chunker: Arc<dyn Chunker>,
}

impl Ingestor {
    /// Create an ingestor from an embedder and a chunker.
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Arc<dyn Chunker>) -> Self {
        Self { embedder, chunker }
    }

    /// Build a new corpus from documents, in document order.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures, and returns [`CragError::InvalidCorpus`]
    /// if the embedder returns a different number of vectors than chunks.
    pub async fn build(&self, documents: &[Document]) -> Result<Corpus> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|document| {
                self.chunker
                    .split(&document.text)
                    .into_iter()
                    .map(move |text| (document.id.clone(), text))
            })
            .enumerate()
            .map(|(ordinal, (document_id, text))| Chunk { ordinal, text, document_id })
            .collect();

        if chunks.is_empty() {
            info!(document_count = documents.len(), chunk_count = 0, "built empty corpus");
            return Ok(Corpus::empty());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, "embedding failed during ingestion");
            e
        })?;

        if embeddings.len() != chunks.len() {
            return Err(CragError::InvalidCorpus(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let index = FlatL2Index::build(&embeddings)?;
        let corpus = Corpus::new(chunks, Box::new(index))?;

        info!(
            corpus.id = %corpus.id(),
            document_count = documents.len(),
            chunk_count = corpus.len(),
            "built corpus"
        );
        Ok(corpus)
    }

    /// Load documents from `source` and build a corpus from them.
    pub async fn build_from(&self, loader: &dyn DocumentLoader, source: &Path) -> Result<Corpus> {
        let documents = loader.load(source).await?;
        self.build(&documents).await
    }
}

/// Holds the currently published corpus snapshot.
///
/// Publishing replaces the snapshot wholesale; in-flight readers keep the
/// `Arc` they already obtained.
#[derive(Debug, Default)]
pub struct CorpusSlot {
    current: RwLock<Option<Arc<Corpus>>>,
}

impl CorpusSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new snapshot, replacing any previous one.
    pub async fn publish(&self, corpus: Corpus) -> Arc<Corpus> {
        let corpus = Arc::new(corpus);
        *self.current.write().await = Some(Arc::clone(&corpus));
        info!(corpus.id = %corpus.id(), chunk_count = corpus.len(), "published corpus");
        corpus
    }

    /// The current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::NoCorpus`] if nothing has been published.
    pub async fn current(&self) -> Result<Arc<Corpus>> {
        self.current.read().await.clone().ok_or(CragError::NoCorpus)
    }
}
