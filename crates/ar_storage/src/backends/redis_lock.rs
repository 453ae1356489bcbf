use ar_core::{LockStore, StoreError, StoreOrigin, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Cmd, RedisError};
use std::env;
use std::time::Duration;
use crate::{BackendConfig, StorageBackend};

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Builds the url from `REDIS_ADDR` (host:port), `REDIS_PASSWORD` and `REDIS_DB`.
    pub fn from_env() -> Self {
        let addr = env::var("REDIS_ADDR").unwrap_or_else(|_| "localhost:6379".to_string());
        let password = env::var("REDIS_PASSWORD").ok();
        let db = env::var("REDIS_DB").ok().and_then(|db| db.parse::<u32>().ok()).unwrap_or(0);
        Self::new(redis_url(&addr, password.as_deref(), db))
    }

    /// Accepts a full `redis://` url or a bare `host:port`.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = if url.contains("://") {
            url.to_string()
        } else {
            redis_url(url, None, 0)
        };
        self
    }
}

impl BackendConfig for RedisConfig {
    fn get_url(&self) -> String {
        self.url.clone()
    }

    fn get_namespace(&self) -> String {
        "lock".to_string()
    }
}

fn redis_url(addr: &str, password: Option<&str>, db: u32) -> String {
    match password {
        Some(password) if !password.is_empty() => format!("redis://:{}@{}/{}", password, addr, db),
        _ => format!("redis://{}/{}", addr, db),
    }
}

/// `SET key value NX PX ttl`: creates the key only if absent, with a millisecond expiry.
fn set_nx_command(key: &str, value: &str, ttl: Duration) -> Cmd {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value).arg("NX").arg("PX").arg(ttl_ms);
    cmd
}

fn map_redis(context: &'static str) -> impl FnOnce(RedisError) -> StoreError {
    move |e| {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            StoreError::Unavailable(format!("{}: lock store unreachable", context))
        } else {
            StoreError::Query(format!("{}: {:?}", context, e.kind()))
        }
    }
}

pub struct RedisLockStore {
    conn: ConnectionManager,
}

#[async_trait]
impl StorageBackend for RedisLockStore {
    type Config = RedisConfig;

    const ORIGIN: StoreOrigin = StoreOrigin::Lock;

    fn get_error_message() -> &'static str {
        "Redis should be reachable at REDIS_ADDR"
    }

    async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|_| StoreError::Unavailable("Invalid lock store url".to_string()))?;
        let mut conn = ConnectionManager::new(client).await.map_err(map_redis("connect"))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(map_redis("ping"))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        // Nil reply means the key already exists
        let reply: Option<String> = set_nx_command(key, value, ttl)
            .query_async(&mut conn)
            .await
            .map_err(map_redis("acquire lock"))?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(map_redis("release lock"))?;
        Ok(())
    }
}
