use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::Article;
use crate::Error;

/// Caller input for creating an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub content: String,
}

/// Caller input for replacing an article's mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleUpdate {
    pub title: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    #[default]
    CreatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CreatedAt => "created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "created_at" => Ok(Self::CreatedAt),
            "id" => Ok(Self::Id),
            other => Err(Error::Validation(format!("unsupported sort field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "desc" => Ok(Self::Desc),
            "asc" => Ok(Self::Asc),
            other => Err(Error::Validation(format!("unsupported sort order: {}", other))),
        }
    }
}

/// One page of the article list, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl ListQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn with_sort(mut self, sort_field: SortField, sort_order: SortOrder) -> Self {
        self.sort_field = sort_field;
        self.sort_order = sort_order;
        self
    }

    /// Number of documents to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl ArticlePage {
    pub fn new(items: Vec<Article>, total: u64, query: &ListQuery) -> Self {
        Self {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
            total_pages: total_pages(total, query.page_size),
        }
    }
}

pub fn total_pages(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}
