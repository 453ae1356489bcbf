use async_trait::async_trait;
use std::time::Duration;

use crate::models::{Article, ArticleContent, ArticleId};
use crate::types::{ArticlePage, ListQuery};
use crate::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Relational store holding the authoritative article and its content.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert the article and its content in one transaction.
    /// The store assigns the id and propagates it to the content row.
    async fn create(&self, article: &Article, content: &ArticleContent) -> StoreResult<ArticleId>;

    async fn exists(&self, id: ArticleId) -> StoreResult<bool>;

    /// Update title, picture, summary, updated_at and the body in one transaction.
    async fn update(&self, article: &Article, content: &ArticleContent) -> StoreResult<()>;

    async fn get(&self, id: ArticleId) -> StoreResult<Option<(Article, ArticleContent)>>;
}

/// Search index serving list reads. Documents never carry the body.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Write a full document snapshot, visible to the next search.
    async fn upsert(&self, article: &Article) -> StoreResult<()>;

    /// Patch the mutable fields of an existing document.
    async fn update(&self, article: &Article) -> StoreResult<()>;

    async fn search(&self, query: &ListQuery) -> StoreResult<ArticlePage>;

    async fn get(&self, id: ArticleId) -> StoreResult<Option<Article>>;
}

/// Key-value store with expiring keys, shared by every service instance.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically create `key` only if absent. Returns true iff the key was created.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
