//! Document chunking strategies.
//!
//! The pipeline only depends on the [`Chunker`] trait. [`RecursiveChunker`]
//! is the default: it splits hierarchically by paragraphs, sentences, then
//! words, and falls back to character windows for oversized words.

/// A strategy for splitting document text into retrievable spans.
pub trait Chunker: Send + Sync {
    /// Split document text into chunk texts, in document order.
    ///
    /// Returns an empty `Vec` if the text is blank.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits text hierarchically: paragraphs → sentences → words → characters.
///
/// Segments are merged greedily up to `chunk_size` characters. When a new
/// chunk starts, up to `chunk_overlap` trailing characters of the previous
/// chunk are carried over if they fit.
///
/// # Example
///
/// ```rust,ignore
/// use crag_engine::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(512, 100);
/// let chunks = chunker.split(&document.text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk (at least 1)
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(512, 100)
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        split_and_merge(text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text by the first separator, then merge segments into chunks that
/// respect `chunk_size`. Oversized segments recurse with the next separator.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }
    let Some((separator, remaining)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };

    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in split_keeping_separator(text, separator) {
        if current.is_empty() {
            current = segment.to_string();
        } else if char_len(&current) + char_len(segment) <= chunk_size {
            current.push_str(segment);
        } else {
            let overlap = tail(&current, chunk_overlap).to_string();
            flush(&mut chunks, current, chunk_size, chunk_overlap, remaining);
            current = if char_len(&overlap) + char_len(segment) <= chunk_size {
                overlap + segment
            } else {
                segment.to_string()
            };
        }
    }

    if !current.is_empty() {
        flush(&mut chunks, current, chunk_size, chunk_overlap, remaining);
    }

    chunks
}

fn flush(
    chunks: &mut Vec<String>,
    current: String,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) {
    if char_len(&current) > chunk_size {
        chunks.extend(split_and_merge(&current, chunk_size, chunk_overlap, separators));
    } else {
        chunks.push(current);
    }
}

/// The last `n` characters of `text`, cut at a char boundary.
fn tail(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-window splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_yields_no_chunks() {
        assert!(RecursiveChunker::new(100, 10).split("  \n ").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = RecursiveChunker::new(100, 10).split("Chichen Itza is a Maya city.");
        assert_eq!(chunks, vec!["Chichen Itza is a Maya city.".to_string()]);
    }

    #[test]
    fn paragraphs_are_split_before_sentences() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = RecursiveChunker::new(25, 0).split(text);
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn chunks_respect_size_limit() {
        let text = "word ".repeat(200);
        let chunks = RecursiveChunker::new(50, 10).split(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "é".repeat(300);
        let chunks = RecursiveChunker::new(64, 8).split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 64));
        assert!(!chunks.is_empty());
    }

    #[test]
    fn tail_cuts_at_char_boundary() {
        assert_eq!(tail("héllo", 4), "éllo");
        assert_eq!(tail("ab", 10), "ab");
        assert_eq!(tail("ab", 0), "");
    }
}
