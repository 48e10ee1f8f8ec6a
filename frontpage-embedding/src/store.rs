//! SQLite content repository using rusqlite
//!
//! Mirrors the relational shape of the front-page database: newspapers own
//! dated front pages, front pages own stories, and daily themes live in
//! `top_stories`. Vectors are stored as pgvector literals.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use frontpage_core::{
    EmbeddingVector, Item, ItemId, ItemKind, NewspaperRef, Story, Theme, EMBEDDING_DIMENSION,
};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    codec::{decode_vector, encode_vector},
    error::{EmbeddingError, Result},
    repository::ContentRepository,
    types::{EmbeddingStats, KindStats},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const STORY_SELECT: &str = "SELECT s.id, s.headline, s.summary, s.sentiment, s.people, s.created_at,
            f.date, n.name, n.slug, n.city, n.state, s.story_embedding
     FROM stories s
     JOIN frontpages f ON s.frontpage_id = f.id
     JOIN newspapers n ON f.newspaper_slug = n.slug";

const THEME_SELECT: &str = "SELECT id, type, theme_headline, theme_summary, date, theme_embedding
     FROM top_stories";

/// SQLite store for stories, themes and their embeddings
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
    dimension: usize,
}

impl SqliteRepository {
    /// Open (or create) a repository database
    ///
    /// # Arguments
    /// * `database_path` - Path to SQLite database file
    #[instrument(skip(database_path))]
    pub fn new<P: AsRef<Path> + std::fmt::Debug>(database_path: P) -> Result<Self> {
        info!("Opening repository database: {:?}", database_path.as_ref());

        if let Some(parent) = database_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EmbeddingError::Database(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        let conn = Connection::open(database_path.as_ref())
            .map_err(|e| EmbeddingError::Database(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EmbeddingError::Database(format!("Failed to create in-memory DB: {}", e))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension: EMBEDDING_DIMENSION,
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Expect vectors of `dimension` values instead of the default 1536
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Create tables the store reads from, if missing
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS newspapers (
                slug TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                city TEXT,
                state TEXT
            );

            CREATE TABLE IF NOT EXISTS frontpages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                newspaper_slug TEXT NOT NULL REFERENCES newspapers(slug),
                date TEXT NOT NULL,
                UNIQUE(newspaper_slug, date)
            );

            CREATE INDEX IF NOT EXISTS idx_frontpages_date ON frontpages(date);

            CREATE TABLE IF NOT EXISTS stories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                frontpage_id INTEGER NOT NULL REFERENCES frontpages(id),
                headline TEXT NOT NULL,
                summary TEXT,
                sentiment TEXT,
                people TEXT,
                created_at INTEGER NOT NULL,
                story_embedding TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_stories_frontpage ON stories(frontpage_id);

            CREATE TABLE IF NOT EXISTS top_stories (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL DEFAULT 'topstories',
                theme_headline TEXT NOT NULL,
                theme_summary TEXT NOT NULL,
                date TEXT NOT NULL,
                theme_embedding TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_top_stories_date ON top_stories(date);",
        )?;

        debug!("Repository tables initialized");
        Ok(())
    }

    /// Insert or update a newspaper
    pub fn insert_newspaper(&self, newspaper: &NewspaperRef) -> Result<()> {
        let conn = self.conn.lock();
        upsert_newspaper(&conn, newspaper)
    }

    /// Get or create the front page of a newspaper for a date
    pub fn insert_frontpage(&self, newspaper_slug: &str, date: NaiveDate) -> Result<i64> {
        let conn = self.conn.lock();
        frontpage_id(&conn, newspaper_slug, date)
    }

    /// Insert a story, creating its newspaper and front page as needed
    ///
    /// The story's own `id` is ignored; the assigned row id is returned.
    pub fn insert_story(&self, story: &Story) -> Result<i64> {
        let embedding = story
            .embedding
            .as_deref()
            .map(|v| self.encode_checked(v))
            .transpose()?;
        let people = serde_json::to_string(&story.people)
            .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        let conn = self.conn.lock();
        upsert_newspaper(&conn, &story.newspaper)?;
        let frontpage = frontpage_id(&conn, &story.newspaper.slug, story.date)?;

        conn.execute(
            "INSERT INTO stories
             (frontpage_id, headline, summary, sentiment, people, created_at, story_embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                frontpage,
                &story.headline,
                &story.summary,
                story.sentiment.map(|s| s.as_str()),
                people,
                story.created_at.timestamp(),
                embedding,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Inserted story {} on {}", id, story.date);
        Ok(id)
    }

    /// Insert a theme under its own id
    pub fn insert_theme(&self, theme: &Theme) -> Result<()> {
        let embedding = theme
            .embedding
            .as_deref()
            .map(|v| self.encode_checked(v))
            .transpose()?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO top_stories
             (id, type, theme_headline, theme_summary, date, theme_embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                theme.id.to_string(),
                theme.theme_type.as_str(),
                &theme.theme_headline,
                &theme.theme_summary,
                theme.date.format(DATE_FORMAT).to_string(),
                embedding,
                Utc::now().timestamp(),
            ],
        )?;

        debug!("Inserted theme {} on {}", theme.id, theme.date);
        Ok(())
    }

    /// Write a vector literal verbatim, bypassing encoding
    ///
    /// Used when importing vectors produced elsewhere; the literal is only
    /// validated when it is read back.
    pub fn set_raw_embedding(&self, id: ItemId, literal: &str) -> Result<()> {
        let conn = self.conn.lock();
        let updated = update_vector_column(&conn, id, literal)?;
        if updated == 0 {
            return Err(EmbeddingError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Get statistics about stored embeddings
    ///
    /// Vectors that fail to decode count as malformed, not as embedded.
    pub fn stats(&self) -> Result<EmbeddingStats> {
        let conn = self.conn.lock();

        let kind_stats = |table: &str, column: &str| -> Result<KindStats> {
            let total: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {column} FROM {table} WHERE {column} IS NOT NULL"
            ))?;
            let mut stats = KindStats {
                total: total as usize,
                ..Default::default()
            };
            for raw in stmt.query_map([], |row| row.get::<_, String>(0))? {
                if decode_vector(&raw?, self.dimension).is_ok() {
                    stats.with_embedding += 1;
                } else {
                    stats.malformed += 1;
                }
            }
            Ok(stats)
        };

        let stories = kind_stats("stories", "story_embedding")?;
        let themes = kind_stats("top_stories", "theme_embedding")?;

        // Get database size (page_count * page_size)
        let page_count: i64 = conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(EmbeddingStats {
            stories,
            themes,
            database_size_bytes: (page_count * page_size) as usize,
        })
    }

    fn encode_checked(&self, vector: &[f32]) -> Result<String> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        encode_vector(vector)
    }

    /// Decode a stored literal, excluding the item on failure
    fn decode_stored(&self, id: ItemId, raw: Option<String>) -> Option<EmbeddingVector> {
        let raw = raw?;
        match decode_vector(&raw, self.dimension) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("Excluding stored vector for {}: {}", id, e);
                None
            }
        }
    }

    fn query_stories<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, story_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            let (mut story, raw) = row?;
            story.embedding = self.decode_stored(ItemId::Story(story.id), raw);
            items.push(Item::Story(story));
        }
        Ok(items)
    }

    fn query_themes<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, theme_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            let (mut theme, raw) = row?;
            theme.embedding = self.decode_stored(ItemId::Theme(theme.id), raw);
            items.push(Item::Theme(theme));
        }
        Ok(items)
    }
}

#[async_trait]
impl ContentRepository for SqliteRepository {
    #[instrument(skip(self))]
    async fn find_items_by_date(
        &self,
        date: NaiveDate,
        kind: ItemKind,
        with_embeddings_only: bool,
    ) -> Result<Vec<Item>> {
        let date = date.format(DATE_FORMAT).to_string();
        let items = match kind {
            ItemKind::Story => {
                let filter = if with_embeddings_only {
                    " AND s.story_embedding IS NOT NULL"
                } else {
                    ""
                };
                let sql = format!("{} WHERE f.date = ?1{} ORDER BY s.id", STORY_SELECT, filter);
                self.query_stories(&sql, params![date])?
            }
            ItemKind::Theme => {
                let filter = if with_embeddings_only {
                    " AND theme_embedding IS NOT NULL"
                } else {
                    ""
                };
                let sql = format!("{} WHERE date = ?1{} ORDER BY rowid", THEME_SELECT, filter);
                self.query_themes(&sql, params![date])?
            }
        };

        info!("Loaded {} {} items for {}", items.len(), kind, date);
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn find_stories_since(&self, since: NaiveDate) -> Result<Vec<Item>> {
        let sql = format!(
            "{} WHERE s.story_embedding IS NOT NULL AND f.date >= ?1 ORDER BY s.id",
            STORY_SELECT
        );
        let items = self.query_stories(&sql, params![since.format(DATE_FORMAT).to_string()])?;

        debug!("Loaded {} stories since {}", items.len(), since);
        Ok(items)
    }

    /// Items with no usable vector: never embedded, or stored malformed
    #[instrument(skip(self))]
    async fn find_items_missing_embedding(&self, kind: ItemKind) -> Result<Vec<Item>> {
        let items = match kind {
            ItemKind::Story => {
                let sql = format!("{} ORDER BY s.id", STORY_SELECT);
                self.query_stories(&sql, [])?
            }
            ItemKind::Theme => {
                let sql = format!("{} ORDER BY rowid", THEME_SELECT);
                self.query_themes(&sql, [])?
            }
        };

        Ok(items
            .into_iter()
            .filter(|item| item.embedding().is_none())
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_item_by_id(&self, id: ItemId) -> Result<Option<Item>> {
        let items = match id {
            ItemId::Story(story_id) => {
                let sql = format!("{} WHERE s.id = ?1", STORY_SELECT);
                self.query_stories(&sql, params![story_id])?
            }
            ItemId::Theme(theme_id) => {
                let sql = format!("{} WHERE id = ?1", THEME_SELECT);
                self.query_themes(&sql, params![theme_id.to_string()])?
            }
        };
        Ok(items.into_iter().next())
    }

    #[instrument(skip(self, embedding), fields(dimension = embedding.len()))]
    async fn persist_embedding(&self, id: ItemId, embedding: &[f32]) -> Result<()> {
        let encoded = self.encode_checked(embedding)?;

        let conn = self.conn.lock();
        let updated = update_vector_column(&conn, id, &encoded)?;
        if updated == 0 {
            return Err(EmbeddingError::NotFound(id.to_string()));
        }

        debug!("Saved embedding for {}", id);
        Ok(())
    }
}

fn upsert_newspaper(conn: &Connection, newspaper: &NewspaperRef) -> Result<()> {
    conn.execute(
        "INSERT INTO newspapers (slug, name, city, state)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(slug) DO UPDATE SET
            name = excluded.name,
            city = excluded.city,
            state = excluded.state",
        params![
            &newspaper.slug,
            &newspaper.name,
            &newspaper.city,
            &newspaper.state
        ],
    )?;
    Ok(())
}

fn frontpage_id(conn: &Connection, newspaper_slug: &str, date: NaiveDate) -> Result<i64> {
    let date = date.format(DATE_FORMAT).to_string();

    conn.execute(
        "INSERT OR IGNORE INTO frontpages (newspaper_slug, date) VALUES (?1, ?2)",
        params![newspaper_slug, &date],
    )?;

    let id = conn
        .query_row(
            "SELECT id FROM frontpages WHERE newspaper_slug = ?1 AND date = ?2",
            params![newspaper_slug, &date],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| EmbeddingError::NotFound(format!("frontpage {} {}", newspaper_slug, date)))?;
    Ok(id)
}

/// Single-statement update of one row's vector column
fn update_vector_column(conn: &Connection, id: ItemId, literal: &str) -> Result<usize> {
    let updated = match id {
        ItemId::Story(story_id) => conn.execute(
            "UPDATE stories SET story_embedding = ?1 WHERE id = ?2",
            params![literal, story_id],
        )?,
        ItemId::Theme(theme_id) => conn.execute(
            "UPDATE top_stories SET theme_embedding = ?1 WHERE id = ?2",
            params![literal, theme_id.to_string()],
        )?,
    };
    Ok(updated)
}

fn parse_date(column: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<(Story, Option<String>)> {
    let sentiment: Option<String> = row.get(3)?;
    let people: Option<String> = row.get(4)?;
    let created_at: i64 = row.get(5)?;
    let date: String = row.get(6)?;

    let story = Story {
        id: row.get(0)?,
        headline: row.get(1)?,
        summary: row.get(2)?,
        sentiment: sentiment.and_then(|s| s.parse().ok()),
        people: people
            .and_then(|p| serde_json::from_str(&p).ok())
            .unwrap_or_default(),
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        date: parse_date(6, &date)?,
        newspaper: NewspaperRef {
            name: row.get(7)?,
            slug: row.get(8)?,
            city: row.get(9)?,
            state: row.get(10)?,
        },
        embedding: None,
    };
    Ok((story, row.get(11)?))
}

fn theme_from_row(row: &Row<'_>) -> rusqlite::Result<(Theme, Option<String>)> {
    let id: String = row.get(0)?;
    let theme_type: String = row.get(1)?;
    let date: String = row.get(4)?;

    let theme = Theme {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        theme_type: theme_type.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into())
        })?,
        theme_headline: row.get(2)?,
        theme_summary: row.get(3)?,
        date: parse_date(4, &date)?,
        embedding: None,
    };
    Ok((theme, row.get(5)?))
}
