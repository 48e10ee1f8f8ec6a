//! Embedding generation for stories and themes
//!
//! Wraps an injected [`EmbeddingProvider`] and turns every failure into
//! "no vector this attempt". Nothing here is fatal: callers retry on a
//! later pass.

use std::sync::Arc;

use frontpage_core::{EmbeddingVector, Item};
use tracing::{debug, info, instrument, warn};

use crate::{error::Result, provider::EmbeddingProvider, repository::ContentRepository};

/// Generates vectors for item text through a provider
#[derive(Clone)]
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Dimension of every vector this generator returns
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Embed free-form text
    ///
    /// Blank text is rejected locally without calling the provider.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn embed(&self, text: &str) -> Option<EmbeddingVector> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Skipping embedding for blank text");
            return None;
        }

        match self.provider.embed(text).await {
            Ok(embedding) if embedding.len() == self.dimension() => Some(embedding),
            Ok(embedding) => {
                warn!(
                    "Provider {} returned dimension {}, expected {}",
                    self.model(),
                    embedding.len(),
                    self.dimension()
                );
                None
            }
            Err(e) => {
                warn!("Embedding generation failed: {}", e);
                None
            }
        }
    }

    /// Embed an item from its headline and summary
    pub async fn embed_item(&self, item: &Item) -> Option<EmbeddingVector> {
        self.embed(&item.embedding_text()).await
    }

    /// Regenerate an item's vector and write it through the repository
    ///
    /// Returns `Ok(None)` when no vector could be generated; the stored value
    /// is left untouched in that case. On success the item carries the new
    /// vector as well.
    #[instrument(skip(self, item, repository), fields(item = %item.id()))]
    pub async fn update_embedding(
        &self,
        item: &mut Item,
        repository: &dyn ContentRepository,
    ) -> Result<Option<EmbeddingVector>> {
        let Some(embedding) = self.embed_item(item).await else {
            return Ok(None);
        };

        repository.persist_embedding(item.id(), &embedding).await?;
        item.set_embedding(Some(embedding.clone()));

        info!("Updated embedding for {}", item.id());
        Ok(Some(embedding))
    }
}
