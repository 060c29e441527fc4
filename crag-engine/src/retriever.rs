//! Nearest-chunk retrieval over a corpus snapshot.

use tracing::debug;

use crate::corpus::Corpus;
use crate::document::RetrievalResult;
use crate::error::{CragError, Result};

/// Map an index distance to a similarity in `(0, 1]`.
///
/// Monotonically decreasing in distance, so nearest-first order is preserved.
/// Overflowed (infinite) distances map to the smallest positive similarity.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (1.0 / (1.0 + distance.max(0.0))).max(f32::MIN_POSITIVE)
}

/// Retrieve the `k` chunks nearest to `query`, most similar first.
///
/// Returns `min(k, corpus.len())` results. Pure: identical inputs give
/// identical output.
///
/// # Errors
///
/// Returns [`CragError::EmptyCorpus`] if the corpus has no chunks and
/// [`CragError::DimensionMismatch`] if `query` does not fit the index.
pub fn retrieve(query: &[f32], corpus: &Corpus, k: usize) -> Result<Vec<RetrievalResult>> {
    let index = corpus.index().ok_or(CragError::EmptyCorpus)?;
    if query.len() != index.dimensions() {
        return Err(CragError::DimensionMismatch {
            expected: index.dimensions(),
            actual: query.len(),
        });
    }

    let results = index
        .query(query, k)?
        .into_iter()
        .map(|neighbor| {
            let chunk = corpus.chunk(neighbor.ordinal).ok_or_else(|| {
                CragError::InvalidCorpus(format!(
                    "index returned ordinal {} outside corpus of {}",
                    neighbor.ordinal,
                    corpus.len()
                ))
            })?;
            Ok(RetrievalResult {
                ordinal: chunk.ordinal,
                text: chunk.text.clone(),
                similarity: similarity_from_distance(neighbor.distance),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(k, returned = results.len(), "retrieved chunks");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_is_full_similarity() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
    }

    #[test]
    fn similarity_decreases_with_distance() {
        assert!(similarity_from_distance(0.5) > similarity_from_distance(2.0));
        assert!(similarity_from_distance(1e9) > 0.0);
    }

    #[test]
    fn infinite_distance_stays_positive() {
        let similarity = similarity_from_distance(f32::INFINITY);
        assert!(similarity > 0.0);
        assert!(similarity <= similarity_from_distance(f32::MAX));
    }
}
