//! Core types for the front-page similarity engine
//!
//! This crate defines the shared data structures used across the engine:
//! the story/theme item model, read-time projections for callers, and the
//! engine-wide error type.

pub mod error;
pub mod item;
pub mod output;

pub use error::{FrontpageError, FrontpageResult};
pub use item::{
    EmbeddingVector, Item, ItemId, ItemKind, NewspaperRef, Sentiment, Story, Theme, ThemeType,
    EMBEDDING_DIMENSION,
};
pub use output::{
    ClusterMember, SentimentDistribution, SimilarityMatch, StoryCluster, StorySummary,
    ThemeSummary,
};
