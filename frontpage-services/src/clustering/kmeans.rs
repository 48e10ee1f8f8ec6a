//! Seeded k-means over embedding coordinates
//!
//! Lloyd iterations with k-means++ seeding. The random generator is seeded
//! from the parameters, so identical input always yields identical
//! assignments.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::ClusteringParams;

/// K-means settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    pub k: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl KMeans {
    pub fn from_params(params: &ClusteringParams) -> Self {
        Self {
            k: params.k,
            max_iterations: params.max_iterations,
            tolerance: params.tolerance,
            seed: params.seed,
        }
    }

    /// Partition the rows of `data`
    ///
    /// `k` larger than the number of rows is clamped to the row count.
    pub fn fit(&self, data: &Array2<f64>) -> KMeansResult {
        let n = data.nrows();
        if n == 0 || self.k == 0 {
            return KMeansResult {
                labels: vec![],
                centroids: Array2::zeros((0, data.ncols())),
                iterations: 0,
                converged: true,
            };
        }

        let k = if self.k > n {
            warn!("k={} exceeds {} points, clamping", self.k, n);
            n
        } else {
            self.k
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = seed_centroids(data, k, &mut rng);
        let mut labels = assign(data, &centroids);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;

            let updated = recompute_centroids(data, &labels, &centroids);
            let shift = updated
                .axis_iter(Axis(0))
                .zip(centroids.axis_iter(Axis(0)))
                .map(|(new, old)| squared_distance(new, old).sqrt())
                .fold(0.0_f64, f64::max);

            centroids = updated;
            labels = assign(data, &centroids);

            if shift < self.tolerance {
                converged = true;
                break;
            }
        }

        debug!(
            "K-means finished: k={}, iterations={}, converged={}",
            k, iterations, converged
        );

        KMeansResult {
            labels,
            centroids,
            iterations,
            converged,
        }
    }
}

/// Outcome of a k-means run
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Centroid index per row
    pub labels: Vec<usize>,
    pub centroids: Array2<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl KMeansResult {
    /// Non-empty groups of row indices, ordered by first member
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut group_of_label: Vec<Option<usize>> = vec![None; self.centroids.nrows()];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for (row, &label) in self.labels.iter().enumerate() {
            match group_of_label[label] {
                Some(g) => groups[g].push(row),
                None => {
                    group_of_label[label] = Some(groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        groups
    }

    /// Sum of squared distances from each row to its centroid
    pub fn inertia(&self, data: &Array2<f64>) -> f64 {
        self.labels
            .iter()
            .enumerate()
            .map(|(row, &label)| squared_distance(data.row(row), self.centroids.row(label)))
            .sum()
    }
}

/// k-means++ seeding
fn seed_centroids(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.random_range(0..n));

    let mut nearest: Vec<f64> = (0..n)
        .map(|i| squared_distance(data.row(i), data.row(chosen[0])))
        .collect();

    while chosen.len() < k {
        let total: f64 = nearest.iter().sum();

        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (i, &weight) in nearest.iter().enumerate() {
                if weight <= 0.0 {
                    continue;
                }
                cumulative += weight;
                pick = Some(i);
                if cumulative > target {
                    break;
                }
            }
            pick
        } else {
            None
        };

        // All remaining points coincide with a chosen centroid
        let next = next
            .or_else(|| (0..n).find(|i| !chosen.contains(i)))
            .unwrap_or(chosen[0]);
        chosen.push(next);

        for (i, slot) in nearest.iter_mut().enumerate() {
            *slot = slot.min(squared_distance(data.row(i), data.row(next)));
        }
    }

    data.select(Axis(0), &chosen)
}

/// Nearest centroid per row; ties go to the lowest centroid index
fn assign(data: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    data.axis_iter(Axis(0))
        .map(|point| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
                let distance = squared_distance(point, centroid);
                if distance < best_distance {
                    best_distance = distance;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Mean of each group; an empty group keeps its previous centroid
fn recompute_centroids(data: &Array2<f64>, labels: &[usize], previous: &Array2<f64>) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; previous.nrows()];

    for (row, &label) in labels.iter().enumerate() {
        let mut sum = sums.row_mut(label);
        sum += &data.row(row);
        counts[label] += 1;
    }

    for (c, count) in counts.into_iter().enumerate() {
        if count == 0 {
            sums.row_mut(c).assign(&previous.row(c));
        } else {
            let mut row = sums.row_mut(c);
            row /= count as f64;
        }
    }
    sums
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let diff: Array1<f64> = &a - &b;
    diff.dot(&diff)
}
