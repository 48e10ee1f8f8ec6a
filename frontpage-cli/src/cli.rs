//! CLI argument parsing for the front page tool
//!
//! Flags override values from `FRONTPAGE_*` environment variables.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use frontpage_core::ItemId;

/// Front page similarity engine
///
/// Embeds stories and themes, finds related stories and groups a day's
/// front pages into clusters.
#[derive(Parser, Debug)]
#[command(name = "frontpage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "FRONTPAGE_DB_PATH", default_value = "data/frontpage.db")]
    pub db_path: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate embeddings for stories and themes that have none
    Backfill {
        /// Minimum delay between provider calls
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Items embedded at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Group a day's stories into clusters of similar stories
    Cluster {
        /// Front page date (YYYY-MM-DD)
        date: NaiveDate,

        /// hierarchical or kmeans
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Similarity threshold for hierarchical clustering
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Smallest cluster kept by hierarchical clustering
        #[arg(long)]
        min_size: Option<usize>,

        /// Number of k-means clusters
        #[arg(short)]
        k: Option<usize>,

        /// Cluster daily themes instead of stories
        #[arg(long)]
        themes: bool,
    },

    /// Find stories similar to a stored story or theme
    Similar {
        /// story:<id>, theme:<uuid>, or a bare id
        id: ItemId,

        /// Minimum similarity (default 0.6)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Only search stories from the last N days (default 180)
        #[arg(short, long)]
        days: Option<u32>,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show how many items have embeddings
    Stats,
}
