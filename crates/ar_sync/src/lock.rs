use ar_core::{ArticleId, Error, LockStore, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::CoordinatorConfig;

const LOCK_MARKER: &str = "locked";

pub fn lock_key(namespace: &str, id: ArticleId) -> String {
    format!("{}:{}", namespace, id)
}

/// Per-article mutual exclusion over a shared [`LockStore`].
///
/// Acquisition is a single attempt: a held lock is reported as not acquired,
/// never waited on. Tokens expire after the lease so a crashed holder cannot
/// block an article forever.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    lease: Duration,
    namespace: String,
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>, config: &CoordinatorConfig) -> Self {
        Self {
            store,
            lease: config.lock_lease,
            namespace: config.lock_namespace.clone(),
        }
    }

    pub fn key(&self, id: ArticleId) -> String {
        lock_key(&self.namespace, id)
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Returns true iff the caller now holds the lock for `id`.
    pub async fn acquire(&self, id: ArticleId) -> Result<bool> {
        let acquired = self
            .store
            .set_if_absent(&self.key(id), LOCK_MARKER, self.lease)
            .await
            .map_err(Error::lock)?;
        debug!("Lock for article {} acquired: {}", id, acquired);
        Ok(acquired)
    }

    /// Unconditionally deletes the lock for `id`.
    pub async fn release(&self, id: ArticleId) -> Result<()> {
        self.store.delete(&self.key(id)).await.map_err(Error::lock)
    }

    /// Guard form of [`acquire`](Self::acquire).
    pub async fn try_lock(&self, id: ArticleId) -> Result<Option<ArticleLock>> {
        if !self.acquire(id).await? {
            return Ok(None);
        }
        Ok(Some(ArticleLock {
            id,
            key: self.key(id),
            store: self.store.clone(),
            released: false,
        }))
    }
}

/// A held article lock.
///
/// Call [`release`](Self::release) when done. A guard dropped without being
/// released (the owning future was cancelled) deletes its key from a
/// background task.
pub struct ArticleLock {
    id: ArticleId,
    key: String,
    store: Arc<dyn LockStore>,
    released: bool,
}

impl ArticleLock {
    pub fn id(&self) -> ArticleId {
        self.id
    }

    pub async fn release(mut self) -> Result<()> {
        let result = self.store.delete(&self.key).await;
        self.released = true;
        result.map_err(Error::lock)
    }
}

impl Drop for ArticleLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("🔓 Lock for article {} dropped before release, releasing in background", id);
                let store = self.store.clone();
                let key = std::mem::take(&mut self.key);
                handle.spawn(async move {
                    if let Err(e) = store.delete(&key).await {
                        error!("Failed to release lock for article {}: {}", id, e);
                    }
                });
            }
            Err(_) => {
                error!("Lock for article {} dropped outside a runtime, it stays until its lease expires", id);
            }
        }
    }
}
