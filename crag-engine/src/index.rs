//! Vector index abstraction and an exact flat L2 implementation.

use crate::error::{CragError, Result};

/// A nearest-neighbour hit returned by a [`VectorIndex`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Ordinal of the stored vector (insertion position).
    pub ordinal: usize,
    /// Distance to the query under the index metric; smaller is nearer.
    pub distance: f32,
}

/// An immutable index over vectors keyed by insertion ordinal.
///
/// Indexes are built once from a full set of vectors and never updated;
/// a new corpus means a new index.
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    /// Number of stored vectors.
    fn size(&self) -> usize;

    /// Dimensionality of stored vectors.
    fn dimensions(&self) -> usize;

    /// Return up to `k` nearest neighbours, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::DimensionMismatch`] if `vector` has the wrong length.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// Exhaustive index using squared Euclidean distance.
///
/// Vectors are stored contiguously; queries scan every vector. Ties keep
/// insertion order so results are reproducible.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Build an index from vectors that all share one dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::IndexError`] if `vectors` is empty or has zero
    /// dimensions, and [`CragError::DimensionMismatch`] if lengths differ.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let dimensions = vectors
            .first()
            .map(Vec::len)
            .ok_or_else(|| CragError::IndexError("cannot build an index from no vectors".into()))?;
        if dimensions == 0 {
            return Err(CragError::IndexError("vectors must have at least one dimension".into()));
        }

        let mut data = Vec::with_capacity(vectors.len() * dimensions);
        for vector in vectors {
            if vector.len() != dimensions {
                return Err(CragError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimensions, data })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatL2Index {
    fn size(&self) -> usize {
        self.data.len() / self.dimensions
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if vector.len() != self.dimensions {
            return Err(CragError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(ordinal, stored)| Neighbor { ordinal, distance: squared_l2(stored, vector) })
            .collect();

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.ordinal.cmp(&b.ordinal)));
        neighbors.truncate(k);
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_nearest_first() {
        let index = FlatL2Index::build(&[vec![3.0, 0.0], vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let hits = index.query(&[0.0, 0.0], 3).unwrap();
        let ordinals: Vec<usize> = hits.iter().map(|n| n.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 0]);
        assert_eq!(hits[2].distance, 9.0);
    }

    #[test]
    fn query_is_bounded_by_size() {
        let index = FlatL2Index::build(&[vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(index.size(), 2);
        assert_eq!(index.query(&[0.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn build_rejects_ragged_vectors() {
        let err = FlatL2Index::build(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, CragError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn query_rejects_wrong_dimension() {
        let index = FlatL2Index::build(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(index.query(&[1.0], 1), Err(CragError::DimensionMismatch { .. })));
    }

    #[test]
    fn build_rejects_empty_input() {
        assert!(matches!(FlatL2Index::build(&[]), Err(CragError::IndexError(_))));
    }
}
