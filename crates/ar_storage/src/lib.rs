use ar_core::{Error, IndexStore, LockStore, RecordStore, Result, StoreOrigin, StoreResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod backends;

pub use backends::*;

const CONNECT_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// A store backend that can be brought up from its config.
#[async_trait]
pub trait StorageBackend: Sized + Send + Sync {
    type Config: BackendConfig + Send + Sync;

    const ORIGIN: StoreOrigin;

    fn get_error_message() -> &'static str;

    async fn connect(config: &Self::Config) -> StoreResult<Self>;
}

pub trait BackendConfig: fmt::Debug {
    fn get_url(&self) -> String;
    fn get_namespace(&self) -> String;
}

/// `url` without any `user:password@` part, safe to log.
pub fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}{}", &url[..scheme + 3], &url[at + 1..]),
        _ => url.to_string(),
    }
}

/// Connect a backend, retrying a few times before giving up.
pub async fn connect_with_retry<T: StorageBackend>(config: &T::Config) -> Result<T> {
    let backend = std::any::type_name::<T>().split("::").last().unwrap_or("unknown");
    let mut attempt = 1;

    loop {
        match T::connect(config).await {
            Ok(store) => {
                info!(
                    "💾 {} store ready (using {} at {}, namespace {})",
                    T::ORIGIN,
                    backend,
                    redacted(&config.get_url()),
                    config.get_namespace()
                );
                return Ok(store);
            }
            Err(e) if attempt < CONNECT_RETRIES => {
                warn!("⚠️ {} failed to connect ({}), retrying {}/{}...", backend, e, attempt, CONNECT_RETRIES);
                attempt += 1;
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                warn!("❌ {}", T::get_error_message());
                return Err(Error::store(T::ORIGIN, e));
            }
        }
    }
}

#[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
pub async fn create_record_store(kind: &str, url: Option<&str>) -> Result<Arc<dyn RecordStore>> {
    match kind {
        "memory" => {
            let store = connect_with_retry::<MemoryRecordStore>(&MemoryConfig::new()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let mut config = SqliteConfig::from_env();
            if let Some(url) = url {
                config = config.with_url(url);
            }
            let store = connect_with_retry::<SQLiteRecordStore>(&config).await?;
            Ok(Arc::new(store))
        }
        other => Err(Error::Validation(format!("Unknown record store backend: {}", other))),
    }
}

#[cfg_attr(not(feature = "elasticsearch"), allow(unused_variables))]
pub async fn create_index_store(kind: &str, url: Option<&str>, index: Option<&str>) -> Result<Arc<dyn IndexStore>> {
    match kind {
        "memory" => {
            let store = connect_with_retry::<MemoryIndexStore>(&MemoryConfig::new()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "elasticsearch")]
        "elasticsearch" => {
            let mut config = ElasticsearchConfig::from_env();
            if let Some(url) = url {
                config = config.with_url(url);
            }
            if let Some(index) = index {
                config = config.with_index(index);
            }
            let store = connect_with_retry::<ElasticsearchIndexStore>(&config).await?;
            Ok(Arc::new(store))
        }
        other => Err(Error::Validation(format!("Unknown index store backend: {}", other))),
    }
}

#[cfg_attr(not(feature = "redis"), allow(unused_variables))]
pub async fn create_lock_store(kind: &str, url: Option<&str>) -> Result<Arc<dyn LockStore>> {
    match kind {
        "memory" => {
            let store = connect_with_retry::<MemoryLockStore>(&MemoryConfig::new()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "redis")]
        "redis" => {
            let mut config = RedisConfig::from_env();
            if let Some(url) = url {
                config = config.with_url(url);
            }
            let store = connect_with_retry::<RedisLockStore>(&config).await?;
            Ok(Arc::new(store))
        }
        other => Err(Error::Validation(format!("Unknown lock store backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{BackendConfig, StorageBackend};
}
