//! Content repository contract consumed by the engine

use async_trait::async_trait;
use chrono::NaiveDate;
use frontpage_core::{Item, ItemId, ItemKind};

use crate::error::Result;

/// Storage for stories and themes
///
/// Implementations own the vector serialization format. Items handed to the
/// engine carry decoded vectors; a stored vector that cannot be decoded is
/// returned as `embedding = None` so it drops out of the computation.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Items of one kind for one date, in corpus order
    ///
    /// Stories are dated by their front page, themes by their own date.
    async fn find_items_by_date(
        &self,
        date: NaiveDate,
        kind: ItemKind,
        with_embeddings_only: bool,
    ) -> Result<Vec<Item>>;

    /// Stories with a stored vector whose front page is dated on or after `since`
    async fn find_stories_since(&self, since: NaiveDate) -> Result<Vec<Item>>;

    /// Items of one kind that have no stored vector yet
    async fn find_items_missing_embedding(&self, kind: ItemKind) -> Result<Vec<Item>>;

    async fn find_item_by_id(&self, id: ItemId) -> Result<Option<Item>>;

    /// Replace the stored vector of a single item
    ///
    /// The write is atomic for that row: either the full vector is stored or
    /// nothing changes.
    async fn persist_embedding(&self, id: ItemId, embedding: &[f32]) -> Result<()>;
}
