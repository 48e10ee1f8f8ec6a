//! Read-time projections handed to the presentation layer
//!
//! Nothing here is persisted. Matches and clusters are rebuilt on every
//! request and owned by the caller.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::{EmbeddingVector, Item, NewspaperRef, Sentiment, Story, Theme, ThemeType};

/// Story fields exposed to callers (embedding stripped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySummary {
    pub id: i64,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub people: Vec<String>,
    pub newspaper: NewspaperRef,
    pub created_at: DateTime<Utc>,
    pub date: NaiveDate,
}

impl From<&Story> for StorySummary {
    fn from(story: &Story) -> Self {
        Self {
            id: story.id,
            headline: story.headline.clone(),
            summary: story.summary.clone(),
            sentiment: story.sentiment,
            people: story.people.clone(),
            newspaper: story.newspaper.clone(),
            created_at: story.created_at,
            date: story.date,
        }
    }
}

/// Theme fields exposed to callers (embedding stripped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub theme_type: ThemeType,
    pub theme_headline: String,
    pub theme_summary: String,
    pub date: NaiveDate,
}

impl From<&Theme> for ThemeSummary {
    fn from(theme: &Theme) -> Self {
        Self {
            id: theme.id,
            theme_type: theme.theme_type,
            theme_headline: theme.theme_headline.clone(),
            theme_summary: theme.theme_summary.clone(),
            date: theme.date,
        }
    }
}

/// A story ranked against a query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    #[serde(flatten)]
    pub story: StorySummary,
    /// Cosine similarity to the query vector (-1.0 - 1.0)
    pub similarity_score: f64,
}

/// Member of a cluster as shown to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterMember {
    Story(StorySummary),
    Theme(ThemeSummary),
}

impl From<&Item> for ClusterMember {
    fn from(item: &Item) -> Self {
        match item {
            Item::Story(story) => ClusterMember::Story(story.into()),
            Item::Theme(theme) => ClusterMember::Theme(theme.into()),
        }
    }
}

/// Count of cluster members per sentiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentDistribution {
    /// Count one member; members without a sentiment are ignored
    pub fn record(&mut self, sentiment: Option<Sentiment>) {
        match sentiment {
            Some(Sentiment::Positive) => self.positive += 1,
            Some(Sentiment::Neutral) => self.neutral += 1,
            Some(Sentiment::Negative) => self.negative += 1,
            None => {}
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

/// A group of semantically related items with descriptive metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryCluster {
    /// Sequential id starting at 1, stable only within one response
    pub cluster_id: usize,
    pub size: usize,
    pub stories: Vec<ClusterMember>,
    pub representative_headline: String,
    /// Mean pairwise cosine similarity among members (1.0 for a singleton)
    pub cohesion: f64,
    pub sentiment_distribution: SentimentDistribution,
    /// Member count per source publication, in first-seen order
    pub newspaper_distribution: IndexMap<String, usize>,
    /// Column-wise mean of member embeddings
    #[serde(skip)]
    pub centroid: EmbeddingVector,
}
