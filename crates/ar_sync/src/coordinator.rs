use ar_core::{
    generate_summary, Article, ArticleContent, ArticleId, ArticlePage, ArticleUpdate, Error,
    IndexStore, ListQuery, LockStore, NewArticle, RecordStore, Result, StoreError, StoreOrigin,
    StoreResult,
};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::lock::LockManager;
use crate::outcome::{UpdateOutcome, WriteOutcome};
use crate::CoordinatorConfig;

/// A store write running on its own task. Dropping it aborts the task.
struct WriteTask {
    origin: StoreOrigin,
    handle: JoinHandle<StoreResult<()>>,
}

impl WriteTask {
    fn spawn<F>(origin: StoreOrigin, write: F) -> Self
    where
        F: Future<Output = StoreResult<()>> + Send + 'static,
    {
        Self {
            origin,
            handle: tokio::spawn(write),
        }
    }

    async fn join(mut self) -> WriteOutcome {
        let result = match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(StoreError::Aborted(format!("{} write panicked", self.origin))),
            Err(_) => Err(StoreError::Aborted(format!("{} write cancelled", self.origin))),
        };
        WriteOutcome::new(self.origin, result)
    }
}

impl Drop for WriteTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Keeps the record store and the search index in step.
///
/// Creates write the record store first and index second. Updates take the
/// article lock, check the article exists, then write both stores
/// concurrently and report every failure. The lock is released on every
/// path once taken, including when the caller drops the update future.
pub struct ArticleCoordinator {
    records: Arc<dyn RecordStore>,
    index: Arc<dyn IndexStore>,
    locks: LockManager,
}

impl ArticleCoordinator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        index: Arc<dyn IndexStore>,
        lock_store: Arc<dyn LockStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            records,
            index,
            locks: LockManager::new(lock_store, &config),
        }
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }

    pub async fn add_article(&self, new: NewArticle) -> Result<ArticleId> {
        let summary = generate_summary(&new.content);
        let article = Article::new(new.title, new.picture, summary);
        let content = ArticleContent::new(ArticleId::default(), new.content);

        let id = self.records.create(&article, &content).await.map_err(Error::relational)?;
        let article = article.with_id(id);

        // No rollback of the record: it stays authoritative and the document
        // can be rebuilt from it.
        if let Err(e) = self.index.upsert(&article).await {
            warn!("⚠️ Article {} saved but not indexed, it needs a reindex: {}", id, e);
            return Err(Error::ConsistencyGap { id, source: e });
        }

        info!("📝 Article {} created", id);
        Ok(id)
    }

    pub async fn list_articles(&self, query: &ListQuery) -> Result<ArticlePage> {
        self.index.search(query).await.map_err(Error::index)
    }

    pub async fn update_article(&self, id: ArticleId, update: ArticleUpdate) -> Result<()> {
        let lock = match self.locks.try_lock(id).await? {
            Some(lock) => lock,
            None => {
                info!("🔒 Article {} is locked by another update", id);
                return Err(Error::Contention(id));
            }
        };
        debug!("🔒 Locked article {}", id);

        let result = self.update_locked(id, update).await;

        if let Err(e) = lock.release().await {
            error!("Failed to unlock article {}: {}", id, e);
        } else {
            debug!("🔓 Unlocked article {}", id);
        }
        result
    }

    async fn update_locked(&self, id: ArticleId, update: ArticleUpdate) -> Result<()> {
        if !self.records.exists(id).await.map_err(Error::relational)? {
            return Err(Error::NotFound(id));
        }

        let summary = generate_summary(&update.content);
        let article = Article::new(update.title, update.picture, summary).with_id(id);
        let content = ArticleContent::new(id, update.content);

        let outcome = self.write_both(article, content).await;
        for failure in outcome.failures() {
            if let Err(e) = &failure.result {
                error!("❌ Failed to update article {} in {} store: {}", id, failure.origin, e);
            }
        }
        if outcome.is_success() {
            info!("✏️ Article {} updated", id);
        }
        outcome.into_result()
    }

    /// Run the record and index updates as two independent tasks and wait for both.
    pub async fn write_both(&self, article: Article, content: ArticleContent) -> UpdateOutcome {
        let records = self.records.clone();
        let record_article = article.clone();
        let relational = WriteTask::spawn(StoreOrigin::Relational, async move {
            records.update(&record_article, &content).await
        });

        let index = self.index.clone();
        let indexed = WriteTask::spawn(StoreOrigin::Index, async move { index.update(&article).await });

        let (relational, indexed) = tokio::join!(relational.join(), indexed.join());
        UpdateOutcome::new(vec![relational, indexed])
    }
}
