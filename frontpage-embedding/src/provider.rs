//! Embedding provider abstraction

use async_trait::async_trait;
use frontpage_core::EmbeddingVector;

use crate::error::{EmbeddingError, Result};

/// Turns text into a fixed-length vector
///
/// Implementations are treated as a black box; every error they return is
/// considered transient and safe to retry on a later pass.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Model identifier, for logging
    fn model(&self) -> &str;

    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;
}

/// Provider for callers with no API credentials
///
/// Fails every call without touching the network, so only stored vectors
/// take part in search and clustering.
#[derive(Debug, Clone)]
pub struct OfflineProvider {
    model: String,
    dimension: usize,
}

impl OfflineProvider {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OfflineProvider {
    async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
        Err(EmbeddingError::Config(
            "no API key configured, embeddings unavailable".to_string(),
        ))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_provider_always_fails() {
        let provider = OfflineProvider::new("text-embedding-3-small", 1536);

        let err = provider.embed("Storm hits coast").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Config(_)));
        assert_eq!(provider.dimension(), 1536);
        assert_eq!(provider.model(), "text-embedding-3-small");
    }
}
