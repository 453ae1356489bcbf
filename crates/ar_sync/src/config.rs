use std::time::Duration;

pub const DEFAULT_LOCK_LEASE: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_LOCK_NAMESPACE: &str = "lock";

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long a lock token lives if its holder never releases it.
    pub lock_lease: Duration,
    /// Prefix of every lock key.
    pub lock_namespace: String,
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self {
            lock_lease: DEFAULT_LOCK_LEASE,
            lock_namespace: DEFAULT_LOCK_NAMESPACE.to_string(),
        }
    }

    pub fn with_lock_lease(mut self, lease: Duration) -> Self {
        self.lock_lease = lease;
        self
    }

    pub fn with_lock_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.lock_namespace = namespace.into();
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
