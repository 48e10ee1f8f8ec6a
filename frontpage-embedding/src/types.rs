//! Core types for embeddings

use frontpage_core::Item;

/// An item scored against a query vector
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: Item,
    /// Cosine similarity score (-1.0 - 1.0)
    pub score: f64,
}

/// Per-kind counts of stored vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub total: usize,
    /// Rows whose stored vector decodes at the configured dimension
    pub with_embedding: usize,
    /// Rows holding a vector that cannot be decoded
    pub malformed: usize,
}

impl KindStats {
    /// Rows the next backfill will embed, malformed ones included
    pub fn missing(&self) -> usize {
        self.total.saturating_sub(self.with_embedding)
    }
}

/// Statistics about embedding storage
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingStats {
    pub stories: KindStats,
    pub themes: KindStats,
    pub database_size_bytes: usize,
}
