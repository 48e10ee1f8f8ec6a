//! Embedding backfill sweep
//!
//! Embeds every story, then every theme, that has no stored vector yet.
//! Provider calls go through a shared [`RateLimiter`]. Cancellation is
//! checked before each item starts, never mid-item, so a stopped sweep
//! leaves every item either fully embedded or untouched.

use std::sync::Arc;

use frontpage_core::{Item, ItemKind};
use frontpage_embedding::{ContentRepository, EmbeddingGenerator};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::BackfillConfig;
use crate::rate_limiter::RateLimiter;

/// Per-kind outcome of a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindReport {
    /// Items found without a vector
    pub pending: usize,
    pub embedded: usize,
    /// Items with no text to embed
    pub skipped: usize,
    pub failed: usize,
}

impl KindReport {
    /// Items not reached before cancellation
    pub fn not_attempted(&self) -> usize {
        self.pending - self.embedded - self.skipped - self.failed
    }
}

/// Outcome of a full sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub stories: KindReport,
    pub themes: KindReport,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Embedded,
    Skipped,
    Failed,
    Cancelled,
}

/// Generates missing embeddings for stored items
pub struct EmbeddingBackfill {
    repository: Arc<dyn ContentRepository>,
    generator: EmbeddingGenerator,
    limiter: Arc<RateLimiter>,
    config: BackfillConfig,
}

impl EmbeddingBackfill {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        generator: EmbeddingGenerator,
        config: BackfillConfig,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.delay_ms, "embeddings"));
        Self {
            repository,
            generator,
            limiter,
            config,
        }
    }

    /// Share a limiter with other callers of the same provider
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Sweep stories, then themes
    ///
    /// Themes are not started once the sweep is cancelled.
    #[instrument(skip(self, cancel))]
    pub async fn run(&self, cancel: &CancellationToken) -> BackfillReport {
        info!("Generating embeddings for stories...");
        let (stories, cancelled) = self.backfill_kind(ItemKind::Story, cancel).await;

        let mut report = BackfillReport {
            stories,
            cancelled,
            ..Default::default()
        };
        if cancelled {
            info!("Backfill cancelled after stories");
            return report;
        }

        info!("Generating embeddings for themes...");
        let (themes, cancelled) = self.backfill_kind(ItemKind::Theme, cancel).await;
        report.themes = themes;
        report.cancelled = cancelled;

        let limiter = self.limiter.stats();
        info!(
            "Backfill finished: stories {}/{} embedded, themes {}/{} embedded, {} of {} provider calls throttled",
            report.stories.embedded,
            report.stories.pending,
            report.themes.embedded,
            report.themes.pending,
            limiter.waited_requests,
            limiter.total_requests
        );
        report
    }

    /// Embed every item of one kind that has no vector
    pub async fn backfill_kind(
        &self,
        kind: ItemKind,
        cancel: &CancellationToken,
    ) -> (KindReport, bool) {
        let pending = match self.repository.find_items_missing_embedding(kind).await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to load {} items missing embeddings: {}", kind, e);
                return (KindReport::default(), cancel.is_cancelled());
            }
        };

        let mut report = KindReport {
            pending: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            info!("All {} items have embeddings", kind);
            return (report, cancel.is_cancelled());
        }

        info!("Found {} {} items without embeddings", pending.len(), kind);

        let outcomes: Vec<Outcome> = stream::iter(pending)
            .map(|item| self.embed_one(item, cancel))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                Outcome::Embedded => report.embedded += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Cancelled => cancelled = true,
            }
        }

        (report, cancelled)
    }

    async fn embed_one(&self, item: Item, cancel: &CancellationToken) -> Outcome {
        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let id = item.id();
        if item.embedding_text().trim().is_empty() {
            warn!("Skipping {}: no text to embed", id);
            return Outcome::Skipped;
        }

        if !self.limiter.acquire_or_cancel(cancel).await {
            return Outcome::Cancelled;
        }

        let Some(embedding) = self.generator.embed_item(&item).await else {
            warn!("Failed to generate embedding for {}", id);
            return Outcome::Failed;
        };

        match self.repository.persist_embedding(id, &embedding).await {
            Ok(()) => {
                info!("Generated embedding for {}", id);
                Outcome::Embedded
            }
            Err(e) => {
                warn!("Failed to save embedding for {}: {}", id, e);
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_attempted() {
        let report = KindReport {
            pending: 10,
            embedded: 4,
            skipped: 1,
            failed: 2,
        };
        assert_eq!(report.not_attempted(), 3);
    }

    #[test]
    fn test_backfill_defaults() {
        let config = BackfillConfig::default();
        assert_eq!(config.delay_ms, 100);
        assert_eq!(config.concurrency, 1);
    }
}
