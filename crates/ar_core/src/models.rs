use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity assigned by the record store. Zero is never a stored id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub u64);

impl ArticleId {
    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for ArticleId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArticleId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Article record. Mirrored into the index without its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub picture: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(title: impl Into<String>, picture: impl Into<String>, summary: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ArticleId::default(),
            title: title.into(),
            picture: picture.into(),
            summary: summary.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: ArticleId) -> Self {
        self.id = id;
        self
    }
}

/// Full body of an article, 1:1 with [`Article`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub article_id: ArticleId,
    pub content: String,
}

impl ArticleContent {
    pub fn new(article_id: ArticleId, content: impl Into<String>) -> Self {
        Self {
            article_id,
            content: content.into(),
        }
    }
}
