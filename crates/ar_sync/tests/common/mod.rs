//! Shared fixtures for coordinator tests: in-memory stores wrapped with
//! switchable failures, write counters and optional latency.

#![allow(dead_code)]

use ar_core::{
    Article, ArticleContent, ArticleId, ArticlePage, IndexStore, ListQuery, LockStore, RecordStore,
    StoreError, StoreResult,
};
use ar_storage::{MemoryIndexStore, MemoryLockStore, MemoryRecordStore};
use ar_sync::{ArticleCoordinator, CoordinatorConfig};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct Faults {
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub delay_ms: AtomicU64,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
}

impl Faults {
    pub fn fail_updates(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    async fn before_create(&self, what: &str) -> StoreResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{}: injected failure", what)));
        }
        Ok(())
    }

    async fn before_update(&self, what: &str) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Query(format!("{}: injected failure", what)));
        }
        Ok(())
    }
}

pub struct FaultyRecordStore {
    pub inner: MemoryRecordStore,
    pub faults: Arc<Faults>,
}

#[async_trait]
impl RecordStore for FaultyRecordStore {
    async fn create(&self, article: &Article, content: &ArticleContent) -> StoreResult<ArticleId> {
        self.faults.before_create("insert article").await?;
        self.inner.create(article, content).await
    }

    async fn exists(&self, id: ArticleId) -> StoreResult<bool> {
        self.inner.exists(id).await
    }

    async fn update(&self, article: &Article, content: &ArticleContent) -> StoreResult<()> {
        self.faults.before_update("update article").await?;
        self.inner.update(article, content).await
    }

    async fn get(&self, id: ArticleId) -> StoreResult<Option<(Article, ArticleContent)>> {
        self.inner.get(id).await
    }
}

pub struct FaultyIndexStore {
    pub inner: MemoryIndexStore,
    pub faults: Arc<Faults>,
}

#[async_trait]
impl IndexStore for FaultyIndexStore {
    async fn upsert(&self, article: &Article) -> StoreResult<()> {
        self.faults.before_create("index article").await?;
        self.inner.upsert(article).await
    }

    async fn update(&self, article: &Article) -> StoreResult<()> {
        self.faults.before_update("update indexed article").await?;
        self.inner.update(article).await
    }

    async fn search(&self, query: &ListQuery) -> StoreResult<ArticlePage> {
        self.inner.search(query).await
    }

    async fn get(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        self.inner.get(id).await
    }
}

pub struct UnreachableLockStore;

#[async_trait]
impl LockStore for UnreachableLockStore {
    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<bool> {
        Err(StoreError::Unavailable("acquire lock: lock store unreachable".to_string()))
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("release lock: lock store unreachable".to_string()))
    }
}

pub struct Harness {
    pub records: MemoryRecordStore,
    pub index: MemoryIndexStore,
    pub locks: MemoryLockStore,
    pub record_faults: Arc<Faults>,
    pub index_faults: Arc<Faults>,
    pub coordinator: ArticleCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_lock_store(MemoryLockStore::new())
    }

    /// A harness whose locks live in `locks`, so two harnesses built on
    /// clones of one store act like two service instances.
    pub fn with_lock_store(locks: MemoryLockStore) -> Self {
        let records = MemoryRecordStore::new();
        let index = MemoryIndexStore::new();
        let record_faults = Arc::new(Faults::default());
        let index_faults = Arc::new(Faults::default());

        let coordinator = ArticleCoordinator::new(
            Arc::new(FaultyRecordStore {
                inner: records.clone(),
                faults: record_faults.clone(),
            }),
            Arc::new(FaultyIndexStore {
                inner: index.clone(),
                faults: index_faults.clone(),
            }),
            Arc::new(locks.clone()),
            CoordinatorConfig::default(),
        );

        Self {
            records,
            index,
            locks,
            record_faults,
            index_faults,
            coordinator,
        }
    }

    /// Another coordinator over the same stores and faults.
    pub fn second_instance(&self) -> ArticleCoordinator {
        ArticleCoordinator::new(
            Arc::new(FaultyRecordStore {
                inner: self.records.clone(),
                faults: self.record_faults.clone(),
            }),
            Arc::new(FaultyIndexStore {
                inner: self.index.clone(),
                faults: self.index_faults.clone(),
            }),
            Arc::new(self.locks.clone()),
            CoordinatorConfig::default(),
        )
    }

    pub fn total_update_calls(&self) -> usize {
        self.record_faults.update_calls() + self.index_faults.update_calls()
    }

    /// Wait for background lock releases to land.
    pub async fn settle(&self) {
        for _ in 0..100 {
            if self.locks.live_keys().await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub fn new_article(title: &str, content: &str) -> ar_core::NewArticle {
    ar_core::NewArticle {
        title: title.to_string(),
        picture: format!("http://img.example.com/{}.png", title),
        content: content.to_string(),
    }
}

pub fn article_update(title: &str, content: &str) -> ar_core::ArticleUpdate {
    ar_core::ArticleUpdate {
        title: title.to_string(),
        picture: format!("http://img.example.com/{}.png", title),
        content: content.to_string(),
    }
}
