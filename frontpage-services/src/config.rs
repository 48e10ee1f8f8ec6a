//! Engine configuration
//!
//! Defaults carry the constants the front-page tooling has always used.
//! `EngineConfig::from_env` overlays `FRONTPAGE_*` variables on top.

use std::fmt;
use std::str::FromStr;

use frontpage_core::{FrontpageError, FrontpageResult, EMBEDDING_DIMENSION};
use frontpage_embedding::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};

/// Configuration for similarity search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Minimum cosine similarity to include a story (-1.0 - 1.0)
    pub threshold: f64,
    /// Only search stories from the last N days
    pub time_window_days: u32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            time_window_days: 30,
        }
    }
}

impl SimilarityConfig {
    /// Settings used when listing stories related to a story or theme
    pub fn for_related_stories() -> Self {
        Self {
            threshold: 0.6,
            time_window_days: 180,
        }
    }
}

/// Clustering algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringAlgorithm {
    /// Agglomerative, average linkage, cut at `1 - threshold`
    #[default]
    Hierarchical,
    /// Seeded k-means over raw embedding coordinates
    KMeans,
}

impl ClusteringAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringAlgorithm::Hierarchical => "hierarchical",
            ClusteringAlgorithm::KMeans => "kmeans",
        }
    }
}

impl fmt::Display for ClusteringAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClusteringAlgorithm {
    type Err = FrontpageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hierarchical" | "agglomerative" => Ok(ClusteringAlgorithm::Hierarchical),
            "kmeans" | "k-means" => Ok(ClusteringAlgorithm::KMeans),
            other => Err(FrontpageError::unknown_algorithm(other)),
        }
    }
}

/// Which item kind a clustering run groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterScope {
    #[default]
    Stories,
    Themes,
}

impl ClusterScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterScope::Stories => "stories",
            ClusterScope::Themes => "themes",
        }
    }
}

impl fmt::Display for ClusterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClusterScope {
    type Err = FrontpageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stories" | "story" => Ok(ClusterScope::Stories),
            "themes" | "theme" => Ok(ClusterScope::Themes),
            other => Err(FrontpageError::config(format!(
                "unknown cluster scope '{}'",
                other
            ))),
        }
    }
}

/// Parameters for grouping similar stories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringParams {
    pub algorithm: ClusteringAlgorithm,
    /// Hierarchical: members of a cluster are at least this similar on average
    pub similarity_threshold: f64,
    /// Hierarchical: smaller clusters are dropped
    pub min_cluster_size: usize,
    /// K-means: number of clusters
    pub k: usize,
    pub max_iterations: usize,
    /// K-means: stop once no centroid moves further than this
    pub tolerance: f64,
    pub seed: u64,
    pub scope: ClusterScope,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            algorithm: ClusteringAlgorithm::Hierarchical,
            similarity_threshold: 0.5,
            min_cluster_size: 2,
            k: 5,
            max_iterations: 100,
            tolerance: 1e-4,
            seed: 42,
            scope: ClusterScope::Stories,
        }
    }
}

impl ClusteringParams {
    /// Reject parameters no clustering run can use
    pub fn validate(&self) -> FrontpageResult<()> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(FrontpageError::invalid_parameter(
                "similarity_threshold",
                format!("{} is outside [-1, 1]", self.similarity_threshold),
            ));
        }
        if self.min_cluster_size == 0 {
            return Err(FrontpageError::invalid_parameter(
                "min_cluster_size",
                "must be at least 1",
            ));
        }
        if self.algorithm == ClusteringAlgorithm::KMeans {
            if self.k == 0 {
                return Err(FrontpageError::invalid_parameter("k", "must be at least 1"));
            }
            if self.max_iterations == 0 {
                return Err(FrontpageError::invalid_parameter(
                    "max_iterations",
                    "must be at least 1",
                ));
            }
            if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
                return Err(FrontpageError::invalid_parameter(
                    "tolerance",
                    format!("{} is not a non-negative number", self.tolerance),
                ));
            }
        }
        Ok(())
    }
}

/// Configuration for the embedding backfill sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Minimum delay between provider calls
    pub delay_ms: u64,
    /// Items embedded at once
    pub concurrency: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            delay_ms: 100,
            concurrency: 1,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub dimension: usize,
    pub model: String,
    pub similarity: SimilarityConfig,
    pub clustering: ClusteringParams,
    pub backfill: BackfillConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: EMBEDDING_DIMENSION,
            model: DEFAULT_MODEL.to_string(),
            similarity: SimilarityConfig::default(),
            clustering: ClusteringParams::default(),
            backfill: BackfillConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `FRONTPAGE_*` environment variables
    pub fn from_env() -> FrontpageResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> FrontpageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "FRONTPAGE_SIMILARITY_THRESHOLD")? {
            config.similarity.threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "FRONTPAGE_TIME_WINDOW_DAYS")? {
            config.similarity.time_window_days = v;
        }
        if let Some(v) = parse_var(&lookup, "FRONTPAGE_CLUSTER_THRESHOLD")? {
            config.clustering.similarity_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "FRONTPAGE_MIN_CLUSTER_SIZE")? {
            config.clustering.min_cluster_size = v;
        }
        if let Some(raw) = lookup("FRONTPAGE_CLUSTER_ALGORITHM") {
            config.clustering.algorithm = raw.parse()?;
        }
        if let Some(v) = parse_var(&lookup, "FRONTPAGE_KMEANS_K")? {
            config.clustering.k = v;
        }
        if let Some(raw) = lookup("FRONTPAGE_CLUSTER_SCOPE") {
            config.clustering.scope = raw.parse()?;
        }
        if let Some(v) = parse_var(&lookup, "FRONTPAGE_BACKFILL_DELAY_MS")? {
            config.backfill.delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "FRONTPAGE_BACKFILL_CONCURRENCY")? {
            config.backfill.concurrency = v;
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> FrontpageResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| FrontpageError::config(format!("{}={:?}: {}", name, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.dimension, 1536);
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.similarity.threshold, 0.75);
        assert_eq!(config.similarity.time_window_days, 30);
        assert_eq!(config.clustering.similarity_threshold, 0.5);
        assert_eq!(config.clustering.min_cluster_size, 2);
        assert_eq!(config.clustering.k, 5);
        assert_eq!(config.clustering.seed, 42);
        assert_eq!(config.backfill.delay_ms, 100);
        assert!(config.clustering.validate().is_ok());
    }

    #[test]
    fn test_related_stories_settings() {
        let config = SimilarityConfig::for_related_stories();
        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.time_window_days, 180);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("FRONTPAGE_CLUSTER_ALGORITHM", "kmeans"),
            ("FRONTPAGE_KMEANS_K", "3"),
            ("FRONTPAGE_CLUSTER_SCOPE", "themes"),
            ("FRONTPAGE_TIME_WINDOW_DAYS", " 7 "),
        ]))
        .unwrap();

        assert_eq!(config.clustering.algorithm, ClusteringAlgorithm::KMeans);
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.clustering.scope, ClusterScope::Themes);
        assert_eq!(config.similarity.time_window_days, 7);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = EngineConfig::from_lookup(lookup(&[("FRONTPAGE_KMEANS_K", "many")])).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("FRONTPAGE_KMEANS_K"));

        let err = EngineConfig::from_lookup(lookup(&[("FRONTPAGE_CLUSTER_ALGORITHM", "spectral")]))
            .unwrap_err();
        assert!(matches!(err, FrontpageError::UnknownAlgorithm(_)));
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("K-Means".parse::<ClusteringAlgorithm>().unwrap(), ClusteringAlgorithm::KMeans);
        assert_eq!(
            "hierarchical".parse::<ClusteringAlgorithm>().unwrap(),
            ClusteringAlgorithm::Hierarchical
        );
        assert!("dbscan".parse::<ClusteringAlgorithm>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let kmeans = |k| ClusteringParams {
            algorithm: ClusteringAlgorithm::KMeans,
            k,
            ..Default::default()
        };
        assert!(kmeans(0).validate().is_err());
        assert!(kmeans(1).validate().is_ok());

        let params = ClusteringParams {
            min_cluster_size: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = ClusteringParams {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
