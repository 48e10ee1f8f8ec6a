//! All-pairs similarity matrix for a corpus snapshot
//!
//! Cost is O(N²) vector comparisons. That is only acceptable because the
//! engine works on a single day's corpus, never on the full archive.

use frontpage_core::Item;
use ndarray::{Array2, Axis};
use tracing::{debug, info, warn};

/// Symmetric N×N cosine similarity matrix with a unit diagonal
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    values: Array2<f64>,
}

impl SimilarityMatrix {
    /// Build the matrix from equally sized vectors
    ///
    /// Rows are L2-normalised once so each pair costs a single dot product.
    /// Only the upper triangle is computed and mirrored, which keeps
    /// `[i][j] == [j][i]` exact.
    pub fn from_vectors(vectors: &[&[f32]]) -> Self {
        let n = vectors.len();
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);

        let mut rows = Array2::<f64>::zeros((n, dimension));
        for (mut row, vector) in rows.axis_iter_mut(Axis(0)).zip(vectors) {
            let norm = vector
                .iter()
                .map(|&v| f64::from(v) * f64::from(v))
                .sum::<f64>()
                .sqrt();
            if norm > 0.0 {
                for (cell, &v) in row.iter_mut().zip(vector.iter()) {
                    *cell = f64::from(v) / norm;
                }
            }
        }

        let mut values = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            values[[i, i]] = 1.0;
            for j in (i + 1)..n {
                let similarity = rows.row(i).dot(&rows.row(j)).clamp(-1.0, 1.0);
                values[[i, j]] = similarity;
                values[[j, i]] = similarity;
            }
        }

        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Similarity between corpus positions `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    /// Distance matrix `1 - similarity`
    pub fn to_distances(&self) -> Array2<f64> {
        self.values.mapv(|similarity| 1.0 - similarity)
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Keep only items carrying a vector of the expected dimension
///
/// Dropped items are logged: a count for missing vectors and one warning
/// per dimension mismatch.
pub fn retain_embedded(items: Vec<Item>, dimension: usize) -> Vec<Item> {
    let total = items.len();
    let mut missing = 0usize;

    let kept: Vec<Item> = items
        .into_iter()
        .filter(|item| match item.embedding() {
            None => {
                missing += 1;
                false
            }
            Some(embedding) if embedding.len() != dimension => {
                warn!(
                    "Excluding {}: vector has dimension {}, expected {}",
                    item.id(),
                    embedding.len(),
                    dimension
                );
                false
            }
            Some(_) => true,
        })
        .collect();

    if missing > 0 {
        info!("Dropped {} of {} items without an embedding", missing, total);
    }
    kept
}

/// Drop unusable items and build the similarity matrix for the rest
///
/// Returns the surviving items in their original order alongside the
/// matrix; row `i` of the matrix corresponds to item `i`.
pub fn build_similarity_matrix(items: Vec<Item>, dimension: usize) -> (Vec<Item>, SimilarityMatrix) {
    let items = retain_embedded(items, dimension);

    let vectors: Vec<&[f32]> = items
        .iter()
        .filter_map(|item| item.embedding().map(Vec::as_slice))
        .collect();
    let matrix = SimilarityMatrix::from_vectors(&vectors);

    debug!("Built {}x{} similarity matrix", matrix.len(), matrix.len());
    (items, matrix)
}
