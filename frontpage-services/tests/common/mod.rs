//! Shared fixtures for service integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use frontpage_core::{
    EmbeddingVector, Item, ItemId, ItemKind, NewspaperRef, Sentiment, Story, Theme, ThemeType,
};
use frontpage_embedding::{
    ContentRepository, EmbeddingError, EmbeddingProvider, Result, SqliteRepository,
};
use frontpage_services::EngineConfig;

/// Vector length used by every fixture
pub const DIMENSION: usize = 4;

/// Keyword per axis; text with none of them points along the last axis
const KEYWORDS: [&str; 3] = ["storm", "election", "market"];

/// Deterministic provider mapping keywords to axes
///
/// Text containing `FAIL` makes the call fail.
pub struct KeywordProvider {
    pub calls: AtomicUsize,
}

impl KeywordProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL") {
            return Err(EmbeddingError::Provider("simulated outage".to_string()));
        }

        let lower = text.to_lowercase();
        let mut vector = vec![0.0; DIMENSION];
        for (axis, keyword) in KEYWORDS.iter().enumerate() {
            vector[axis] = lower.matches(keyword).count() as f32;
        }
        if vector.iter().all(|&v| v == 0.0) {
            vector[DIMENSION - 1] = 1.0;
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        "keyword-test"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Provider that always fails
pub struct FailingProvider;

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
        Err(EmbeddingError::Provider("connection refused".to_string()))
    }

    fn model(&self) -> &str {
        "failing-test"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Repository wrapper counting every call
pub struct CountingRepository {
    pub inner: SqliteRepository,
    pub calls: AtomicUsize,
}

impl CountingRepository {
    pub fn new(inner: SqliteRepository) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentRepository for CountingRepository {
    async fn find_items_by_date(
        &self,
        date: NaiveDate,
        kind: ItemKind,
        with_embeddings_only: bool,
    ) -> Result<Vec<Item>> {
        self.record();
        self.inner
            .find_items_by_date(date, kind, with_embeddings_only)
            .await
    }

    async fn find_stories_since(&self, since: NaiveDate) -> Result<Vec<Item>> {
        self.record();
        self.inner.find_stories_since(since).await
    }

    async fn find_items_missing_embedding(&self, kind: ItemKind) -> Result<Vec<Item>> {
        self.record();
        self.inner.find_items_missing_embedding(kind).await
    }

    async fn find_item_by_id(&self, id: ItemId) -> Result<Option<Item>> {
        self.record();
        self.inner.find_item_by_id(id).await
    }

    async fn persist_embedding(&self, id: ItemId, embedding: &[f32]) -> Result<()> {
        self.record();
        self.inner.persist_embedding(id, embedding).await
    }
}

/// Repository whose every call fails, as when the database is unreachable
pub struct UnavailableRepository;

fn unavailable<T>() -> Result<T> {
    Err(EmbeddingError::Database("database is locked".to_string()))
}

#[async_trait]
impl ContentRepository for UnavailableRepository {
    async fn find_items_by_date(
        &self,
        _date: NaiveDate,
        _kind: ItemKind,
        _with_embeddings_only: bool,
    ) -> Result<Vec<Item>> {
        unavailable()
    }

    async fn find_stories_since(&self, _since: NaiveDate) -> Result<Vec<Item>> {
        unavailable()
    }

    async fn find_items_missing_embedding(&self, _kind: ItemKind) -> Result<Vec<Item>> {
        unavailable()
    }

    async fn find_item_by_id(&self, _id: ItemId) -> Result<Option<Item>> {
        unavailable()
    }

    async fn persist_embedding(&self, _id: ItemId, _embedding: &[f32]) -> Result<()> {
        unavailable()
    }
}

pub fn repository() -> SqliteRepository {
    SqliteRepository::new_in_memory()
        .expect("in-memory repository")
        .with_dimension(DIMENSION)
}

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        dimension: DIMENSION,
        model: "keyword-test".to_string(),
        ..Default::default()
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, d).expect("valid date")
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn newspaper(name: &str) -> NewspaperRef {
    NewspaperRef {
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        city: Some("Springfield".to_string()),
        state: Some("IL".to_string()),
    }
}

pub fn story(
    headline: &str,
    summary: Option<&str>,
    date: NaiveDate,
    paper: &str,
    embedding: Option<Vec<f32>>,
) -> Story {
    Story {
        id: 0,
        headline: headline.to_string(),
        summary: summary.map(str::to_string),
        sentiment: Some(Sentiment::Neutral),
        people: vec![],
        created_at: Utc::now(),
        date,
        newspaper: newspaper(paper),
        embedding,
    }
}

pub fn theme(headline: &str, summary: &str, date: NaiveDate, embedding: Option<Vec<f32>>) -> Theme {
    Theme {
        id: uuid::Uuid::new_v4(),
        theme_type: ThemeType::TopStories,
        theme_headline: headline.to_string(),
        theme_summary: summary.to_string(),
        date,
        embedding,
    }
}

/// Story ids of a cluster's members
pub fn member_ids(cluster: &frontpage_core::StoryCluster) -> Vec<i64> {
    cluster
        .stories
        .iter()
        .filter_map(|member| match member {
            frontpage_core::ClusterMember::Story(story) => Some(story.id),
            frontpage_core::ClusterMember::Theme(_) => None,
        })
        .collect()
}
