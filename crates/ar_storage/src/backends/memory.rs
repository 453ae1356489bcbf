use ar_core::{
    Article, ArticleContent, ArticleId, ArticlePage, IndexStore, ListQuery, LockStore, RecordStore,
    SortField, SortOrder, StoreError, StoreOrigin, StoreResult,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use crate::{BackendConfig, StorageBackend};

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub namespace: String,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self {
            namespace: "article".to_string(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendConfig for MemoryConfig {
    fn get_url(&self) -> String {
        "memory://".to_string()
    }

    fn get_namespace(&self) -> String {
        self.namespace.clone()
    }
}

#[derive(Default)]
struct RecordTable {
    last_id: u64,
    rows: BTreeMap<ArticleId, (Article, ArticleContent)>,
}

/// Record store kept in process. Each call holds the table lock for its
/// whole duration, which gives the same all-or-nothing visibility as a transaction.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    table: Arc<RwLock<RecordTable>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryRecordStore {
    type Config = MemoryConfig;

    const ORIGIN: StoreOrigin = StoreOrigin::Relational;

    fn get_error_message() -> &'static str {
        "Memory record store should be available"
    }

    async fn connect(_config: &MemoryConfig) -> StoreResult<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, article: &Article, content: &ArticleContent) -> StoreResult<ArticleId> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = ArticleId(table.last_id);

        let article = article.clone().with_id(id);
        let content = ArticleContent::new(id, content.content.clone());
        table.rows.insert(id, (article, content));
        Ok(id)
    }

    async fn exists(&self, id: ArticleId) -> StoreResult<bool> {
        Ok(self.table.read().await.rows.contains_key(&id))
    }

    async fn update(&self, article: &Article, content: &ArticleContent) -> StoreResult<()> {
        let mut table = self.table.write().await;
        let (stored, stored_content) = table
            .rows
            .get_mut(&article.id)
            .ok_or_else(|| StoreError::Missing(format!("article row {}", article.id)))?;

        stored.title = article.title.clone();
        stored.picture = article.picture.clone();
        stored.summary = article.summary.clone();
        stored.updated_at = article.updated_at;
        stored_content.content = content.content.clone();
        Ok(())
    }

    async fn get(&self, id: ArticleId) -> StoreResult<Option<(Article, ArticleContent)>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }
}

/// Search index kept in process. Writes are visible immediately.
#[derive(Clone, Default)]
pub struct MemoryIndexStore {
    documents: Arc<RwLock<BTreeMap<ArticleId, Article>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn compare(a: &Article, b: &Article, field: SortField) -> std::cmp::Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
    }
}

#[async_trait]
impl StorageBackend for MemoryIndexStore {
    type Config = MemoryConfig;

    const ORIGIN: StoreOrigin = StoreOrigin::Index;

    fn get_error_message() -> &'static str {
        "Memory index store should be available"
    }

    async fn connect(_config: &MemoryConfig) -> StoreResult<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn upsert(&self, article: &Article) -> StoreResult<()> {
        self.documents.write().await.insert(article.id, article.clone());
        Ok(())
    }

    async fn update(&self, article: &Article) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let doc = documents
            .get_mut(&article.id)
            .ok_or_else(|| StoreError::Missing(format!("index document {}", article.id)))?;

        doc.title = article.title.clone();
        doc.picture = article.picture.clone();
        doc.summary = article.summary.clone();
        doc.updated_at = article.updated_at;
        Ok(())
    }

    async fn search(&self, query: &ListQuery) -> StoreResult<ArticlePage> {
        let documents = self.documents.read().await;
        let mut articles: Vec<Article> = documents.values().cloned().collect();
        articles.sort_by(|a, b| match query.sort_order {
            SortOrder::Asc => compare(a, b, query.sort_field),
            SortOrder::Desc => compare(b, a, query.sort_field),
        });

        let total = articles.len() as u64;
        let items = articles
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .collect();
        Ok(ArticlePage::new(items, total, query))
    }

    async fn get(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }
}

/// Lock store kept in process. Clones share the same keys, so several
/// coordinators built on clones behave like instances sharing one Redis.
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    keys: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is held by a lease that has not expired yet.
    pub async fn is_held(&self, key: &str) -> bool {
        let keys = self.keys.read().await;
        matches!(keys.get(key), Some((_, expires_at)) if *expires_at > Instant::now())
    }

    pub async fn live_keys(&self) -> usize {
        let now = Instant::now();
        self.keys.read().await.values().filter(|(_, expires_at)| *expires_at > now).count()
    }
}

#[async_trait]
impl StorageBackend for MemoryLockStore {
    type Config = MemoryConfig;

    const ORIGIN: StoreOrigin = StoreOrigin::Lock;

    fn get_error_message() -> &'static str {
        "Memory lock store should be available"
    }

    async fn connect(_config: &MemoryConfig) -> StoreResult<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut keys = self.keys.write().await;
        let now = Instant::now();
        if let Some((_, expires_at)) = keys.get(key) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        keys.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.keys.write().await.remove(key);
        Ok(())
    }
}
