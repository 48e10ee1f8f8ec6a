//! Similarity and clustering services for newspaper front pages
//!
//! This crate orchestrates the embedding crate: it finds related stories,
//! groups a day's stories into clusters, and backfills missing embeddings.

pub mod backfill;
pub mod cluster_metadata;
pub mod clustering;
pub mod config;
pub mod rate_limiter;
pub mod similarity_service;

pub use backfill::{BackfillReport, EmbeddingBackfill, KindReport};
pub use cluster_metadata::describe_cluster;
pub use config::{
    BackfillConfig, ClusterScope, ClusteringAlgorithm, ClusteringParams, EngineConfig,
    SimilarityConfig,
};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use similarity_service::{cluster_items, SearchOptions, SimilarityService};
