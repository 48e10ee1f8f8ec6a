//! Descriptive metadata for clusters

use frontpage_core::{ClusterMember, EmbeddingVector, Item, SentimentDistribution, StoryCluster};
use frontpage_embedding::SimilarityMatrix;
use indexmap::IndexMap;

/// Build a cluster from corpus positions
///
/// `members` index into both `items` and `matrix`, in corpus order.
pub fn describe_cluster(
    cluster_id: usize,
    members: &[usize],
    items: &[Item],
    matrix: &SimilarityMatrix,
) -> StoryCluster {
    let member_items: Vec<&Item> = members.iter().map(|&i| &items[i]).collect();

    let mut sentiment_distribution = SentimentDistribution::default();
    let mut newspaper_distribution: IndexMap<String, usize> = IndexMap::new();
    for item in &member_items {
        sentiment_distribution.record(item.sentiment());
        if let Some(name) = item.publication() {
            *newspaper_distribution.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    StoryCluster {
        cluster_id,
        size: members.len(),
        stories: member_items.iter().map(|&item| ClusterMember::from(item)).collect(),
        representative_headline: representative_headline(&member_items),
        cohesion: cohesion(members, matrix),
        sentiment_distribution,
        newspaper_distribution,
        centroid: centroid(&member_items),
    }
}

/// Shortest headline by character count, first one on ties
pub fn representative_headline(members: &[&Item]) -> String {
    members
        .iter()
        .map(|item| item.headline())
        .reduce(|best, headline| {
            if headline.chars().count() < best.chars().count() {
                headline
            } else {
                best
            }
        })
        .unwrap_or_default()
        .to_string()
}

/// Mean similarity over all unordered member pairs, 1.0 without pairs
pub fn cohesion(members: &[usize], matrix: &SimilarityMatrix) -> f64 {
    if members.len() <= 1 {
        return 1.0;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (n, &i) in members.iter().enumerate() {
        for &j in &members[n + 1..] {
            total += matrix.get(i, j);
            pairs += 1;
        }
    }
    total / pairs as f64
}

/// Column-wise mean of member vectors
///
/// Members without a vector are skipped; empty when none has one.
pub fn centroid(members: &[&Item]) -> EmbeddingVector {
    let vectors: Vec<&EmbeddingVector> = members.iter().filter_map(|item| item.embedding()).collect();
    let Some(first) = vectors.first() else {
        return Vec::new();
    };

    let mut sums = vec![0.0f64; first.len()];
    for vector in &vectors {
        for (sum, &value) in sums.iter_mut().zip(vector.iter()) {
            *sum += f64::from(value);
        }
    }

    let count = vectors.len() as f64;
    sums.into_iter().map(|sum| (sum / count) as f32).collect()
}
