//! Embeddings and vector similarity for newspaper front pages
//!
//! This crate turns stories and daily themes into vectors with OpenAI's
//! text-embedding-3-small model and compares them.
//!
//! ## Features
//! - Generate embeddings for stories and themes through an injectable provider
//! - Calculate cosine similarity and rank a corpus against a query vector
//! - Build all-pairs similarity matrices for a single day's corpus
//! - Store and retrieve items and their vectors from SQLite

pub mod client;
pub mod codec;
pub mod error;
pub mod generator;
pub mod matrix;
pub mod provider;
pub mod repository;
pub mod similarity;
pub mod store;
pub mod types;

pub use client::{EmbeddingClient, DEFAULT_MODEL};
pub use codec::{decode_vector, encode_vector};
pub use error::{EmbeddingError, Result};
pub use generator::EmbeddingGenerator;
pub use matrix::{build_similarity_matrix, SimilarityMatrix};
pub use provider::{EmbeddingProvider, OfflineProvider};
pub use repository::ContentRepository;
pub use similarity::{cosine_distance, cosine_similarity, rank_by_similarity, RankOptions};
pub use store::SqliteRepository;
pub use types::{EmbeddingStats, KindStats, ScoredItem};
