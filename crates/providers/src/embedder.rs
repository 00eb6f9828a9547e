//! Embedder adapter over a provider's embeddings endpoint.

use papertalk_core::error::EmbeddingError;
use papertalk_core::provider::EmbeddingRequest;
use papertalk_core::{Embedder, Provider};
use std::sync::Arc;

/// Exposes a provider's `/embeddings` endpoint as an [`Embedder`].
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: response.embeddings.len(),
            });
        }

        Ok(response.embeddings)
    }
}
