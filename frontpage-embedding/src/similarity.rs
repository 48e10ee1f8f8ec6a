//! Cosine similarity calculations

use frontpage_core::{Item, ItemId};
use ndarray::ArrayView1;
use tracing::{debug, warn};

use crate::types::ScoredItem;

/// Calculate cosine similarity between two embeddings
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical direction).
/// A zero-magnitude vector has similarity 0.0 with everything.
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
/// where:
/// - A · B is the dot product
/// - ||A|| and ||B|| are the magnitudes (L2 norms)
///
/// Accumulates in f64 so identical vectors score 1.0 well within 1e-9.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    assert_eq!(
        a.len(),
        b.len(),
        "Embeddings must have same dimension (got {} and {})",
        a.len(),
        b.len()
    );

    let a_view = ArrayView1::from(a).mapv(f64::from);
    let b_view = ArrayView1::from(b).mapv(f64::from);

    let dot_product = a_view.dot(&b_view);
    let norm_a = a_view.dot(&a_view).sqrt();
    let norm_b = b_view.dot(&b_view).sqrt();

    // Avoid division by zero
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Cosine distance, `1 - cosine_similarity`
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Options for ranking a corpus against a query vector
#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    /// Minimum similarity score to keep an item
    pub threshold: f64,
    /// Maximum number of results, all matches when `None`
    pub limit: Option<usize>,
    /// Item removed from the results after ranking
    pub exclude_id: Option<ItemId>,
}

/// Rank corpus items by similarity to a query vector
///
/// Items without a vector, or with a vector of a different dimension than
/// the query, are skipped. Results are sorted by score (highest first);
/// ties keep corpus order.
pub fn rank_by_similarity(
    query: &[f32],
    corpus: Vec<Item>,
    options: &RankOptions,
) -> Vec<ScoredItem> {
    debug!(
        "Ranking corpus: {} candidates, threshold={}, limit={:?}",
        corpus.len(),
        options.threshold,
        options.limit
    );

    let mut matches: Vec<ScoredItem> = corpus
        .into_iter()
        .filter_map(|item| {
            let score = {
                let embedding = item.embedding()?;
                if embedding.len() != query.len() {
                    warn!(
                        "Skipping {}: vector dimension {} does not match query dimension {}",
                        item.id(),
                        embedding.len(),
                        query.len()
                    );
                    return None;
                }
                cosine_similarity(query, embedding)
            };
            Some(ScoredItem { item, score })
        })
        .filter(|m| m.score >= options.threshold)
        .collect();

    // Stable sort keeps corpus order for equal scores
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));

    if let Some(exclude_id) = options.exclude_id {
        matches.retain(|m| m.item.id() != exclude_id);
    }

    if let Some(limit) = options.limit {
        matches.truncate(limit);
    }

    debug!("Found {} matches above threshold", matches.len());
    if let Some(top) = matches.first() {
        debug!("Top match: {} score={:.3}", top.item.id(), top.score);
    }

    matches
}
