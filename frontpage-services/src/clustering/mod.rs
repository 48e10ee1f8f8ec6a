//! Clustering engine
//!
//! Both algorithms return groups of corpus positions. Groups are ordered by
//! their first member and list members in corpus order, so cluster ids
//! assigned from this order are stable for identical input.

pub mod hierarchical;
pub mod kmeans;

use frontpage_core::Item;
use frontpage_embedding::SimilarityMatrix;
use ndarray::Array2;
use tracing::{debug, info};

use crate::config::{ClusteringAlgorithm, ClusteringParams};

pub use hierarchical::{Dendrogram, Merge};
pub use kmeans::{KMeans, KMeansResult};

/// Partition embedded items into groups of positions
///
/// `items` and `matrix` must describe the same corpus: row `i` of the
/// matrix belongs to `items[i]`, and every item carries a vector.
pub fn partition(
    items: &[Item],
    matrix: &SimilarityMatrix,
    params: &ClusteringParams,
) -> Vec<Vec<usize>> {
    let groups = match params.algorithm {
        ClusteringAlgorithm::Hierarchical => hierarchical::cluster(
            &matrix.to_distances(),
            params.similarity_threshold,
            params.min_cluster_size,
        ),
        ClusteringAlgorithm::KMeans => {
            let rows = embedding_rows(items);
            let result = KMeans::from_params(params).fit(&rows);
            debug!(
                "k-means inertia {:.4} after {} iterations",
                result.inertia(&rows),
                result.iterations
            );
            result.groups()
        }
    };

    info!(
        "{} clustering of {} items produced {} groups",
        params.algorithm,
        items.len(),
        groups.len()
    );
    groups
}

/// Stack item vectors into an N×D matrix
fn embedding_rows(items: &[Item]) -> Array2<f64> {
    let dimension = items
        .iter()
        .find_map(|item| item.embedding().map(Vec::len))
        .unwrap_or(0);

    let mut rows = Array2::<f64>::zeros((items.len(), dimension));
    for (mut row, item) in rows.outer_iter_mut().zip(items) {
        if let Some(embedding) = item.embedding() {
            for (cell, &value) in row.iter_mut().zip(embedding) {
                *cell = f64::from(value);
            }
        }
    }
    rows
}
