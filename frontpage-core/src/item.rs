//! Clusterable items: front-page stories and editorial themes

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Embedding vector (1536 dimensions for text-embedding-3-small)
pub type EmbeddingVector = Vec<f32>;

/// Dimension shared by every vector in a corpus
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Sentiment tag assigned to a story during extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            _ => Err(format!("Unknown sentiment: {}", s)),
        }
    }
}

/// Which variant of [`Item`] a value or query refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Story,
    Theme,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Story => "story",
            ItemKind::Theme => "theme",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "story" | "stories" => Ok(ItemKind::Story),
            "theme" | "themes" | "topstory" | "topstories" => Ok(ItemKind::Theme),
            _ => Err(format!("Unknown item kind: {}", s)),
        }
    }
}

/// Identifier of a persisted item
///
/// Stories use the integer row id, themes a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ItemId {
    Story(i64),
    Theme(Uuid),
}

impl ItemId {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemId::Story(_) => ItemKind::Story,
            ItemId::Theme(_) => ItemKind::Theme,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Story(id) => write!(f, "story:{}", id),
            ItemId::Theme(id) => write!(f, "theme:{}", id),
        }
    }
}

impl FromStr for ItemId {
    type Err = String;

    /// Accepts `story:<int>`, `theme:<uuid>`, a bare integer (story) or a bare UUID (theme)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((kind, raw)) = s.split_once(':') {
            return match kind.parse::<ItemKind>()? {
                ItemKind::Story => raw
                    .parse::<i64>()
                    .map(ItemId::Story)
                    .map_err(|e| format!("Invalid story id {}: {}", raw, e)),
                ItemKind::Theme => Uuid::parse_str(raw)
                    .map(ItemId::Theme)
                    .map_err(|e| format!("Invalid theme id {}: {}", raw, e)),
            };
        }

        if let Ok(id) = s.parse::<i64>() {
            return Ok(ItemId::Story(id));
        }
        Uuid::parse_str(s)
            .map(ItemId::Theme)
            .map_err(|_| format!("Unrecognised item id: {}", s))
    }
}

/// Newspaper that printed a story's front page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewspaperRef {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// A story extracted from a newspaper front page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Named entities mentioned in the story
    #[serde(default)]
    pub people: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Date of the parent front page
    pub date: NaiveDate,
    pub newspaper: NewspaperRef,
    #[serde(skip)]
    pub embedding: Option<EmbeddingVector>,
}

/// Kind of editorial theme row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeType {
    TopStories,
    TopThemes,
}

impl ThemeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeType::TopStories => "topstories",
            ThemeType::TopThemes => "topthemes",
        }
    }
}

impl FromStr for ThemeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "topstories" => Ok(ThemeType::TopStories),
            "topthemes" => Ok(ThemeType::TopThemes),
            _ => Err(format!("Unknown theme type: {}", s)),
        }
    }
}

/// A daily theme summarising several stories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub theme_type: ThemeType,
    pub theme_headline: String,
    pub theme_summary: String,
    pub date: NaiveDate,
    #[serde(skip)]
    pub embedding: Option<EmbeddingVector>,
}

/// Anything the engine can embed, search and cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Story(Story),
    Theme(Theme),
}

impl Item {
    pub fn id(&self) -> ItemId {
        match self {
            Item::Story(story) => ItemId::Story(story.id),
            Item::Theme(theme) => ItemId::Theme(theme.id),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Story(_) => ItemKind::Story,
            Item::Theme(_) => ItemKind::Theme,
        }
    }

    /// Story headline or theme headline
    pub fn headline(&self) -> &str {
        match self {
            Item::Story(story) => &story.headline,
            Item::Theme(theme) => &theme.theme_headline,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Item::Story(story) => story.date,
            Item::Theme(theme) => theme.date,
        }
    }

    pub fn embedding(&self) -> Option<&EmbeddingVector> {
        match self {
            Item::Story(story) => story.embedding.as_ref(),
            Item::Theme(theme) => theme.embedding.as_ref(),
        }
    }

    pub fn set_embedding(&mut self, embedding: Option<EmbeddingVector>) {
        match self {
            Item::Story(story) => story.embedding = embedding,
            Item::Theme(theme) => theme.embedding = embedding,
        }
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        match self {
            Item::Story(story) => story.sentiment,
            Item::Theme(_) => None,
        }
    }

    /// Name of the source publication, if the item has one
    pub fn publication(&self) -> Option<&str> {
        match self {
            Item::Story(story) => Some(story.newspaper.name.as_str()),
            Item::Theme(_) => None,
        }
    }

    /// Text sent to the embedding provider
    ///
    /// Non-empty headline and summary joined by a single space. Missing
    /// fields are dropped rather than replaced.
    pub fn embedding_text(&self) -> String {
        match self {
            Item::Story(story) => {
                join_non_empty([Some(story.headline.as_str()), story.summary.as_deref()])
            }
            Item::Theme(theme) => join_non_empty([
                Some(theme.theme_headline.as_str()),
                Some(theme.theme_summary.as_str()),
            ]),
        }
    }

    pub fn as_story(&self) -> Option<&Story> {
        match self {
            Item::Story(story) => Some(story),
            Item::Theme(_) => None,
        }
    }
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
