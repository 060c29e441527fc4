//! Property tests for exact nearest-chunk retrieval.

use crag_engine::document::Chunk;
use crag_engine::{Corpus, FlatL2Index, retrieve};
use proptest::prelude::*;

const DIM: usize = 8;

fn arb_vector(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-10.0f32..10.0f32, dim)
}

fn corpus_from(vectors: &[Vec<f32>]) -> Corpus {
    let chunks = (0..vectors.len())
        .map(|ordinal| Chunk {
            ordinal,
            text: format!("chunk {ordinal}"),
            document_id: "doc".to_string(),
        })
        .collect();
    Corpus::new(chunks, Box::new(FlatL2Index::build(vectors).unwrap())).unwrap()
}

/// For any corpus and query, retrieval returns `min(k, n)` results in
/// non-increasing similarity order, every similarity in `(0, 1]`.
mod prop_retrieval_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_sorted_bounded_and_in_unit_interval(
            vectors in proptest::collection::vec(arb_vector(DIM), 1..30),
            query in arb_vector(DIM),
            k in 1usize..40,
        ) {
            let corpus = corpus_from(&vectors);
            let results = retrieve(&query, &corpus, k).unwrap();

            prop_assert_eq!(results.len(), k.min(vectors.len()));
            for result in &results {
                prop_assert!(result.similarity > 0.0 && result.similarity <= 1.0);
                prop_assert_eq!(&corpus.chunks()[result.ordinal].text, &result.text);
            }
            for window in results.windows(2) {
                prop_assert!(
                    window[0].similarity >= window[1].similarity,
                    "results not in descending order: {} < {}",
                    window[0].similarity,
                    window[1].similarity,
                );
            }
        }
    }
}

/// Retrieval is pure: the same query against the same snapshot gives the
/// same ordinals and similarities.
mod prop_retrieval_idempotence {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn repeated_queries_agree(
            vectors in proptest::collection::vec(arb_vector(DIM), 1..20),
            query in arb_vector(DIM),
            k in 1usize..10,
        ) {
            let corpus = corpus_from(&vectors);
            let first = retrieve(&query, &corpus, k).unwrap();
            let second = retrieve(&query, &corpus, k).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn wider_retrieval_extends_narrower_one(
            vectors in proptest::collection::vec(arb_vector(DIM), 1..20),
            query in arb_vector(DIM),
        ) {
            let corpus = corpus_from(&vectors);
            let narrow = retrieve(&query, &corpus, 3).unwrap();
            let wide = retrieve(&query, &corpus, 6).unwrap();
            prop_assert_eq!(&wide[..narrow.len()], &narrow[..]);
        }
    }
}

#[test]
fn exact_match_has_full_similarity() {
    let corpus = corpus_from(&[vec![1.0; DIM], vec![2.0; DIM]]);
    let results = retrieve(&[1.0; DIM], &corpus, 1).unwrap();
    assert_eq!(results[0].ordinal, 0);
    assert_eq!(results[0].similarity, 1.0);
}

#[test]
fn wrong_query_dimension_is_rejected() {
    let corpus = corpus_from(&[vec![0.0; DIM]]);
    let err = retrieve(&[0.0; 3], &corpus, 1).unwrap_err();
    assert!(matches!(err, crag_engine::CragError::DimensionMismatch { expected: 8, actual: 3 }));
}

#[test]
fn empty_corpus_is_rejected() {
    let err = retrieve(&[0.0; DIM], &Corpus::empty(), 3).unwrap_err();
    assert!(matches!(err, crag_engine::CragError::EmptyCorpus));
}
