//! Embedder trait for generating vector embeddings from text.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations must be deterministic for a given model version: the
/// retriever's idempotence relies on identical text producing identical
/// vectors. The default [`embed_batch`](Embedder::embed_batch) implementation
/// calls [`embed`](Embedder::embed) sequentially; backends that support native
/// batching should override it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// A local, deterministic bag-of-words embedder using the hashing trick.
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets with a hash-derived sign, and the vector is L2-normalised. Texts
/// sharing vocabulary land close together, which is enough to run the
/// pipeline offline without an embedding service.
///
/// Tokens are hashed with the standard library's `DefaultHasher`, whose
/// algorithm may change between Rust releases. Vectors are stable within one
/// build only, so a corpus must be embedded by the same binary that queries
/// it. Text with no alphanumeric tokens embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of the given size (at least 1).
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("Chichen Itza is a Maya city").await.unwrap();
        let b = embedder.embed("Chichen Itza is a Maya city").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_eq!(embedder.embed("  ").await.unwrap(), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn punctuation_only_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_eq!(embedder.embed("??? !!").await.unwrap(), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let embedder = HashingEmbedder::new(32);
        let batch = embedder.embed_batch(&["alpha", "beta"]).await.unwrap();
        assert_eq!(batch[0], embedder.embed("alpha").await.unwrap());
        assert_eq!(batch[1], embedder.embed("beta").await.unwrap());
    }
}
