//! Embedder trait — the opaque text-to-vector function used by retrieval.
//!
//! The embedding model is an external collaborator; retrieval only needs
//! `&[String] -> Vec<Vec<f32>>`. Production wires this to a provider's
//! embeddings endpoint; tests use deterministic stubs.

use crate::error::EmbeddingError;
use async_trait::async_trait;

/// Turns texts into fixed-length embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}
