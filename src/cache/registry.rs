//! Cache Registry Module
//!
//! Fixed set of named caches, one per logical data domain, with bulk
//! invalidation by domain or by user.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{Cache, CacheConfig, CacheStats, EvictionMode, EvictionPolicy};
use crate::clock::Clock;
use crate::error::{Result, StateError};

// == Domain Names ==
pub const TRANSACTIONS: &str = "transactions";
pub const USER_DATA: &str = "userData";
pub const STATS: &str = "stats";
pub const ATTACHMENTS: &str = "attachments";

/// Separator between the user id and the rest of a cache key.
pub const KEY_SEPARATOR: char = ':';

// == User Key ==
/// Builds a cache key owned by `user_id`, e.g. `user_key("u1", "list:2024")`
/// gives `"u1:list:2024"`. Keys built this way are removed by
/// [`CacheRegistry::clear_user`].
pub fn user_key(user_id: &str, rest: &str) -> String {
    format!("{}{}{}", user_id, KEY_SEPARATOR, rest)
}

// == Cache Domain ==
/// Registration of one named cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDomain {
    pub name: String,
    pub max_size: usize,
    pub default_ttl: Duration,
    pub policy: EvictionPolicy,
}

impl CacheDomain {
    pub fn new(
        name: impl Into<String>,
        max_size: usize,
        default_ttl: Duration,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            max_size,
            default_ttl,
            policy,
        }
    }

    /// The standard domains of the expense tracker.
    pub fn defaults() -> Vec<CacheDomain> {
        vec![
            CacheDomain::new(TRANSACTIONS, 500, Duration::from_secs(5 * 60), EvictionPolicy::Lru),
            CacheDomain::new(USER_DATA, 200, Duration::from_secs(10 * 60), EvictionPolicy::Lru),
            CacheDomain::new(STATS, 100, Duration::from_secs(2 * 60), EvictionPolicy::Lru),
            CacheDomain::new(ATTACHMENTS, 300, Duration::from_secs(15 * 60), EvictionPolicy::Lru),
        ]
    }
}

// == Cache Registry ==
/// Named caches, created once and never added to afterwards.
#[derive(Debug)]
pub struct CacheRegistry<T = serde_json::Value> {
    caches: BTreeMap<String, Cache<T>>,
}

impl<T: Clone> CacheRegistry<T> {
    /// Creates one cache per domain. A repeated name keeps the last registration.
    pub fn new(domains: &[CacheDomain], mode: EvictionMode, clock: Arc<dyn Clock>) -> Self {
        let caches = domains
            .iter()
            .map(|domain| {
                let config = CacheConfig::new(domain.max_size, domain.default_ttl, domain.policy)
                    .with_mode(mode);
                (domain.name.clone(), Cache::new(config, clock.clone()))
            })
            .collect();

        Self { caches }
    }

    /// Registry with [`CacheDomain::defaults`].
    pub fn with_defaults(mode: EvictionMode, clock: Arc<dyn Clock>) -> Self {
        Self::new(&CacheDomain::defaults(), mode, clock)
    }

    // == Get ==
    /// Looks up a cache by domain name.
    pub fn get(&self, name: &str) -> Result<&Cache<T>> {
        self.caches
            .get(name)
            .ok_or_else(|| StateError::UnknownCache(name.to_string()))
    }

    /// Registered domain names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    // == Clear All ==
    /// Clears every registered cache.
    pub fn clear_all(&self) {
        for cache in self.caches.values() {
            cache.clear();
        }
        info!(caches = self.caches.len(), "Cleared all caches");
    }

    // == Clear Domain ==
    /// Clears one named cache.
    pub fn clear_domain(&self, name: &str) -> Result<()> {
        self.get(name)?.clear();
        debug!(domain = name, "Cleared cache domain");
        Ok(())
    }

    // == Clear User ==
    /// Removes every key built with [`user_key`] for `user_id`, in every
    /// domain. Returns the number of entries removed.
    pub fn clear_user(&self, user_id: &str) -> usize {
        let prefix = user_key(user_id, "");
        let removed = self
            .caches
            .values()
            .map(|cache| cache.delete_prefix(&prefix))
            .sum();
        debug!(user_id, removed, "Cleared user cache entries");
        removed
    }

    // == Purge Expired ==
    /// Purges expired entries from every cache.
    pub fn purge_expired(&self) -> usize {
        self.caches.values().map(Cache::purge_expired).sum()
    }

    // == Stats ==
    /// Snapshot of every cache, keyed by name.
    pub fn stats(&self) -> BTreeMap<String, CacheStats> {
        self.caches
            .iter()
            .map(|(name, cache)| (name.clone(), cache.stats()))
            .collect()
    }
}
