pub mod config;
pub mod coordinator;
pub mod lock;
pub mod outcome;

pub use config::CoordinatorConfig;
pub use coordinator::ArticleCoordinator;
pub use lock::{lock_key, ArticleLock, LockManager};
pub use outcome::{UpdateOutcome, WriteOutcome};

pub mod prelude {
    pub use super::{ArticleCoordinator, CoordinatorConfig, LockManager};
    pub use ar_core::prelude::*;
}
