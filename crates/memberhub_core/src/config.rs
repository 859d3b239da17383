//! Repository configuration.
//!
//! # Responsibility
//! - Hold cache namespace, TTLs and notification channel names in one place.
//! - Provide defaults matching the push service contract.
//!
//! # Invariants
//! - Namespace, queue names and register prefixes are non-empty.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Retention of the latest-update-time registers: 400 hours.
pub const DEFAULT_UPDATE_TIME_RETENTION_SECS: u64 = 3600 * 400;

const DEFAULT_NAMESPACE: &str = "memberhub:rep";
const DEFAULT_MEMBER_UPDATE_QUEUE: &str = "memberhub:queue:member:update";
const DEFAULT_MEMBER_NOTIFY_QUEUE: &str = "memberhub:queue:member:tcp_notify";
const DEFAULT_ACCOUNT_NOTIFY_QUEUE: &str = "memberhub:queue:account:tcp_notify";
const DEFAULT_MEMBER_UPDATE_TIME_PREFIX: &str = "memberhub:member:update_time:";
const DEFAULT_ACCOUNT_UPDATE_TIME_PREFIX: &str = "memberhub:account:update_time:";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "repository config field `{}` cannot be empty", self.field)
    }
}

impl Error for ConfigError {}

/// Configuration for the cache-coherent member repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Prefix shared by every cache key the repository writes.
    pub cache_namespace: String,
    /// TTL for cached entity values; `None` keeps entries until evicted.
    pub cache_ttl: Option<Duration>,
    /// Retention of the per-subject latest-update-time registers.
    pub update_time_retention_secs: u64,
    /// Queue receiving `"{id}-create"` / `"{id}-update"` member events.
    pub member_update_queue: String,
    /// Queue receiving raw member ids for the TCP push service.
    pub member_notify_queue: String,
    /// Queue receiving raw member ids on account changes.
    pub account_notify_queue: String,
    pub member_update_time_prefix: String,
    pub account_update_time_prefix: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            cache_namespace: DEFAULT_NAMESPACE.to_string(),
            cache_ttl: None,
            update_time_retention_secs: DEFAULT_UPDATE_TIME_RETENTION_SECS,
            member_update_queue: DEFAULT_MEMBER_UPDATE_QUEUE.to_string(),
            member_notify_queue: DEFAULT_MEMBER_NOTIFY_QUEUE.to_string(),
            account_notify_queue: DEFAULT_ACCOUNT_NOTIFY_QUEUE.to_string(),
            member_update_time_prefix: DEFAULT_MEMBER_UPDATE_TIME_PREFIX.to_string(),
            account_update_time_prefix: DEFAULT_ACCOUNT_UPDATE_TIME_PREFIX.to_string(),
        }
    }
}

impl RepoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = namespace.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_update_time_retention(mut self, secs: u64) -> Self {
        self.update_time_retention_secs = secs;
        self
    }

    /// Overrides the three queue names (member update, member notify, account notify).
    pub fn with_queues(
        mut self,
        member_update: impl Into<String>,
        member_notify: impl Into<String>,
        account_notify: impl Into<String>,
    ) -> Self {
        self.member_update_queue = member_update.into();
        self.member_notify_queue = member_notify.into();
        self.account_notify_queue = account_notify.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields: [(&'static str, &str); 6] = [
            ("cache_namespace", &self.cache_namespace),
            ("member_update_queue", &self.member_update_queue),
            ("member_notify_queue", &self.member_notify_queue),
            ("account_notify_queue", &self.account_notify_queue),
            ("member_update_time_prefix", &self.member_update_time_prefix),
            ("account_update_time_prefix", &self.account_update_time_prefix),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError { field });
            }
        }
        Ok(())
    }
}
