//! Similarity Service
//!
//! Finds stories related to a story or theme and groups a day's front
//! pages into clusters of similar stories. Search and clustering degrade
//! to empty results when the provider or the repository fails; only
//! invalid clustering parameters are reported as errors.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use frontpage_core::{
    EmbeddingVector, FrontpageResult, Item, ItemId, ItemKind, SimilarityMatch, StoryCluster,
};
use frontpage_embedding::{
    build_similarity_matrix, rank_by_similarity, ContentRepository, EmbeddingGenerator,
    EmbeddingProvider, RankOptions, Result as EmbeddingResult,
};
use tracing::{debug, info, instrument, warn};

use crate::cluster_metadata::describe_cluster;
use crate::clustering;
use crate::config::{ClusterScope, ClusteringParams, EngineConfig, SimilarityConfig};

/// Options for a single similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Minimum cosine similarity to include a story
    pub threshold: f64,
    /// Only search stories from the last N days
    pub time_window_days: u32,
    pub limit: Option<usize>,
    /// Story removed from the results, typically the reference itself
    pub exclude_id: Option<ItemId>,
    /// Day the time window ends on, today when unset
    pub as_of: Option<NaiveDate>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SimilarityConfig::default().into()
    }
}

impl From<SimilarityConfig> for SearchOptions {
    fn from(config: SimilarityConfig) -> Self {
        Self {
            threshold: config.threshold,
            time_window_days: config.time_window_days,
            limit: None,
            exclude_id: None,
            as_of: None,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn excluding(mut self, id: ItemId) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Earliest front page date inside the window
    fn cutoff(&self) -> NaiveDate {
        let as_of = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        as_of
            .checked_sub_days(Days::new(u64::from(self.time_window_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Similarity search and clustering over the front page corpus
pub struct SimilarityService {
    repository: Arc<dyn ContentRepository>,
    generator: EmbeddingGenerator,
    config: EngineConfig,
}

impl SimilarityService {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        provider: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            generator: EmbeddingGenerator::new(provider),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> Arc<dyn ContentRepository> {
        Arc::clone(&self.repository)
    }

    /// Stories similar to a story or theme, best match first
    ///
    /// Uses the reference's stored vector when it has one and embeds its
    /// text otherwise. Always searches the story corpus.
    #[instrument(skip(self, reference), fields(reference = %reference.id()))]
    pub async fn find_similar(&self, reference: &Item, options: &SearchOptions) -> Vec<SimilarityMatch> {
        let query = match reference.embedding() {
            Some(embedding) => embedding.clone(),
            None => match self.generator.embed_item(reference).await {
                Some(embedding) => embedding,
                None => {
                    info!("No embedding available for {}, returning no matches", reference.id());
                    return Vec::new();
                }
            },
        };

        self.find_similar_to_vector(&query, options).await
    }

    /// Stories similar to a raw query vector
    pub async fn find_similar_to_vector(
        &self,
        query: &[f32],
        options: &SearchOptions,
    ) -> Vec<SimilarityMatch> {
        let cutoff = options.cutoff();
        let corpus = match self.repository.find_stories_since(cutoff).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to load stories since {}: {}", cutoff, e);
                return Vec::new();
            }
        };

        debug!("Searching {} stories since {}", corpus.len(), cutoff);

        let rank_options = RankOptions {
            threshold: options.threshold,
            limit: options.limit,
            exclude_id: options.exclude_id,
        };

        rank_by_similarity(query, corpus, &rank_options)
            .into_iter()
            .filter_map(|scored| {
                let story = scored.item.as_story()?;
                Some(SimilarityMatch {
                    story: story.into(),
                    similarity_score: scored.score,
                })
            })
            .collect()
    }

    /// Stories related to a stored story or theme
    ///
    /// Uses the related-stories settings and never returns the reference
    /// itself. Unknown ids yield no matches.
    pub async fn find_related(&self, id: ItemId, limit: Option<usize>) -> Vec<SimilarityMatch> {
        let reference = match self.repository.find_item_by_id(id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                info!("{} not found", id);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to load {}: {}", id, e);
                return Vec::new();
            }
        };

        let mut options: SearchOptions = SimilarityConfig::for_related_stories().into();
        options.limit = limit;
        if id.kind() == ItemKind::Story {
            options.exclude_id = Some(id);
        }

        self.find_similar(&reference, &options).await
    }

    /// Generate a vector for an item and store it
    ///
    /// Replaces any previous vector. `Ok(None)` means the provider could
    /// not produce one this time; nothing was written.
    pub async fn update_embedding(&self, item: &mut Item) -> EmbeddingResult<Option<EmbeddingVector>> {
        self.generator
            .update_embedding(item, self.repository.as_ref())
            .await
    }

    /// Group one day's items into clusters of similar items
    ///
    /// Parameters are validated before the repository is queried. A day
    /// with no embedded items yields no clusters.
    #[instrument(skip(self, params), fields(algorithm = %params.algorithm, scope = %params.scope))]
    pub async fn group_similar_stories(
        &self,
        date: NaiveDate,
        params: &ClusteringParams,
    ) -> FrontpageResult<Vec<StoryCluster>> {
        params.validate()?;

        let kind = match params.scope {
            ClusterScope::Stories => ItemKind::Story,
            ClusterScope::Themes => ItemKind::Theme,
        };

        let items = match self.repository.find_items_by_date(date, kind, true).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to load {} items for {}: {}", kind, date, e);
                return Ok(Vec::new());
            }
        };

        if items.is_empty() {
            info!("No {} items with embeddings found for {}", kind, date);
            return Ok(Vec::new());
        }

        Ok(cluster_items(items, self.config.dimension, params))
    }
}

/// Cluster an in-memory corpus and describe every group
///
/// Items without a usable vector are dropped first.
pub fn cluster_items(items: Vec<Item>, dimension: usize, params: &ClusteringParams) -> Vec<StoryCluster> {
    let (items, matrix) = build_similarity_matrix(items, dimension);
    if items.is_empty() {
        return Vec::new();
    }

    let clusters: Vec<StoryCluster> = clustering::partition(&items, &matrix, params)
        .iter()
        .enumerate()
        .map(|(index, members)| describe_cluster(index + 1, members, &items, &matrix))
        .collect();

    info!(
        "Grouped {} items into {} clusters",
        items.len(),
        clusters.len()
    );
    clusters
}
