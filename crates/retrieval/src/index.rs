//! Immutable per-document vector index.
//!
//! Owns the chunked, embedded representation of a single document and
//! answers top-k nearest-neighbor queries by cosine similarity. There are
//! no mutation operations: re-ingestion always builds a fresh index.

use papertalk_core::error::RetrievalError;
use serde::{Deserialize, Serialize};

/// Where a chunk came from within its source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocator {
    /// 1-based page number
    pub page: u32,

    /// Byte offset of the chunk within the page text
    pub offset: usize,
}

/// A bounded slice of document text, the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub locator: SourceLocator,
}

#[derive(Debug)]
struct EmbeddedChunk {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

/// A single document's chunked, embedded representation.
#[derive(Debug)]
pub struct DocumentIndex {
    chunks: Vec<EmbeddedChunk>,
}

impl DocumentIndex {
    /// Build an index from chunk/embedding pairs in document order.
    ///
    /// An empty sequence (e.g. from a PDF with no extractable text) is
    /// rejected rather than silently producing an empty index.
    pub fn build(chunks: Vec<(DocumentChunk, Vec<f32>)>) -> Result<Self, RetrievalError> {
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyDocument);
        }
        Ok(Self {
            chunks: chunks
                .into_iter()
                .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
                .collect(),
        })
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Return up to `k` chunks ranked by descending cosine similarity to
    /// the query embedding. Ties keep original chunk order (stable sort).
    /// Fewer than `k` chunks means all of them are returned, still sorted.
    pub fn query(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(&DocumentChunk, f32)>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "k must be positive".into(),
            ));
        }

        let mut scored: Vec<(&DocumentChunk, f32)> = self
            .chunks
            .iter()
            .map(|e| (&e.chunk, cosine_similarity(&e.embedding, query_embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]; 0.0 for mismatched lengths, empty vectors,
/// or a zero-magnitude operand.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}
