pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;

#[cfg(feature = "redis")]
pub mod redis_lock;

pub use memory::{MemoryConfig, MemoryIndexStore, MemoryLockStore, MemoryRecordStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{SQLiteRecordStore, SqliteConfig};

#[cfg(feature = "elasticsearch")]
pub use elasticsearch::{ElasticsearchConfig, ElasticsearchIndexStore};

#[cfg(feature = "redis")]
pub use redis_lock::{RedisConfig, RedisLockStore};
