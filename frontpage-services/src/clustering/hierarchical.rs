//! Agglomerative clustering with average linkage
//!
//! Builds the full merge tree over a distance matrix, then cuts it at a
//! fixed distance to produce flat groups.

use ndarray::Array2;
use tracing::debug;

/// One merge step of the tree
///
/// Node ids below the leaf count are corpus positions; merge `m` creates
/// node `leaves + m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    /// Average distance between the two merged groups
    pub distance: f64,
    /// Number of leaves under the new node
    pub size: usize,
}

/// Merge tree produced by average-linkage agglomeration
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    leaves: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Agglomerate every point of a square distance matrix
    ///
    /// Repeatedly merges the closest pair of active groups. The distance
    /// from a merged group to any other group is the mean of all pairwise
    /// point distances between them, maintained with the Lance-Williams
    /// update. Equal distances merge the pair found first in row-major
    /// order over the active groups.
    pub fn average_linkage(distances: &Array2<f64>) -> Self {
        let leaves = distances.nrows();

        // Active groups: (node id, leaf count), plus their pairwise distances
        let mut active: Vec<(usize, usize)> = (0..leaves).map(|i| (i, 1)).collect();
        let mut dist: Vec<Vec<f64>> = (0..leaves)
            .map(|i| (0..leaves).map(|j| distances[[i, j]]).collect())
            .collect();
        let mut merges = Vec::with_capacity(leaves.saturating_sub(1));

        while active.len() > 1 {
            let (mut a, mut b) = (0, 1);
            let mut closest = f64::INFINITY;
            for i in 0..active.len() {
                for j in (i + 1)..active.len() {
                    if dist[i][j] < closest {
                        closest = dist[i][j];
                        a = i;
                        b = j;
                    }
                }
            }

            let (node_a, size_a) = active[a];
            let (node_b, size_b) = active[b];
            let size = size_a + size_b;

            merges.push(Merge {
                left: node_a,
                right: node_b,
                distance: closest,
                size,
            });

            // Merged group takes slot `a`, slot `b` is removed
            for k in 0..active.len() {
                if k == a || k == b {
                    continue;
                }
                let merged = (size_a as f64 * dist[k][a] + size_b as f64 * dist[k][b]) / size as f64;
                dist[k][a] = merged;
                dist[a][k] = merged;
            }
            dist[a][a] = 0.0;

            active[a] = (leaves + merges.len() - 1, size);
            active.remove(b);
            dist.remove(b);
            for row in dist.iter_mut() {
                row.remove(b);
            }
        }

        debug!("Agglomerated {} points in {} merges", leaves, merges.len());
        Self { leaves, merges }
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat groups from every merge at or below `max_distance`
    ///
    /// Groups are ordered by their first member's corpus position and list
    /// members in corpus order. Points never merged come back as singletons.
    pub fn cut(&self, max_distance: f64) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..self.leaves).collect();

        fn find(parent: &mut [usize], i: usize) -> usize {
            if parent[i] != i {
                parent[i] = find(parent, parent[i]);
            }
            parent[i]
        }

        fn union(parent: &mut [usize], i: usize, j: usize) {
            let pi = find(parent, i);
            let pj = find(parent, j);
            if pi != pj {
                // Lowest position stays root so group order is stable
                let (root, child) = if pi < pj { (pi, pj) } else { (pj, pi) };
                parent[child] = root;
            }
        }

        // Any leaf under each node stands in for the whole node
        let mut first_leaf: Vec<usize> = (0..self.leaves).collect();
        for merge in &self.merges {
            let left = first_leaf[merge.left];
            let right = first_leaf[merge.right];
            first_leaf.push(left.min(right));

            if merge.distance <= max_distance {
                union(&mut parent, left, right);
            }
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of_root: Vec<Option<usize>> = vec![None; self.leaves];
        for leaf in 0..self.leaves {
            let root = find(&mut parent, leaf);
            match group_of_root[root] {
                Some(g) => groups[g].push(leaf),
                None => {
                    group_of_root[root] = Some(groups.len());
                    groups.push(vec![leaf]);
                }
            }
        }
        groups
    }
}

/// Cluster a distance matrix at similarity `threshold`
///
/// Cuts the average-linkage tree at distance `1 - threshold` and drops
/// groups smaller than `min_cluster_size`.
pub fn cluster(distances: &Array2<f64>, threshold: f64, min_cluster_size: usize) -> Vec<Vec<usize>> {
    let max_distance = 1.0 - threshold;
    let dendrogram = Dendrogram::average_linkage(distances);
    let groups = dendrogram.cut(max_distance);
    let total = groups.len();
    let fused = dendrogram
        .merges()
        .iter()
        .filter(|merge| merge.distance <= max_distance)
        .count();

    let kept: Vec<Vec<usize>> = groups
        .into_iter()
        .filter(|group| group.len() >= min_cluster_size)
        .collect();

    debug!(
        "Hierarchical cut at {:.3}: {} merges fused, {} groups, {} kept (min size {})",
        max_distance,
        fused,
        total,
        kept.len(),
        min_cluster_size
    );
    kept
}
