//! Configuration Module
//!
//! Loads subsystem and admin-server settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheDomain, EvictionMode};
use crate::limiter::BlockTiers;
use crate::security::DEFAULT_MAX_EVENTS;

/// Subsystem configuration.
///
/// Scalar values can be configured via environment variables with sensible
/// defaults; cache domains and block tiers are set in code.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port of the admin server
    pub server_port: u16,
    /// Cleanup sweep interval in seconds
    pub cleanup_interval: u64,
    /// Security events older than this many seconds are swept
    pub event_max_age: u64,
    /// Capacity of the security event ring
    pub max_events: usize,
    /// Whether cache eviction honours LFU/FIFO or always evicts by recency
    pub eviction_mode: EvictionMode,
    /// Named caches to register
    pub cache_domains: Vec<CacheDomain>,
    /// Progressive blocking table
    pub block_tiers: BlockTiers,
}

const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_CLEANUP_INTERVAL: u64 = 60;
const DEFAULT_EVENT_MAX_AGE: u64 = 7 * 24 * 60 * 60;

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `EVENT_MAX_AGE` - Event retention in seconds (default: 7 days)
    /// - `SECURITY_MAX_EVENTS` - Event ring capacity (default: 10000)
    /// - `CACHE_EVICTION_MODE` - `strict` or `legacy` (default: strict)
    pub fn from_env() -> Self {
        Self {
            server_port: env_or("SERVER_PORT", DEFAULT_SERVER_PORT),
            cleanup_interval: env_or("CLEANUP_INTERVAL", DEFAULT_CLEANUP_INTERVAL),
            event_max_age: env_or("EVENT_MAX_AGE", DEFAULT_EVENT_MAX_AGE),
            max_events: env_or("SECURITY_MAX_EVENTS", DEFAULT_MAX_EVENTS),
            eviction_mode: env_or("CACHE_EVICTION_MODE", EvictionMode::default()),
            ..Self::default()
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        // A zero interval would spin the sweep loop
        Duration::from_secs(self.cleanup_interval.max(1))
    }

    pub fn event_max_age(&self) -> Duration {
        Duration::from_secs(self.event_max_age)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            event_max_age: DEFAULT_EVENT_MAX_AGE,
            max_events: DEFAULT_MAX_EVENTS,
            eviction_mode: EvictionMode::default(),
            cache_domains: CacheDomain::defaults(),
            block_tiers: BlockTiers::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.event_max_age, 604_800);
        assert_eq!(config.max_events, 10_000);
        assert_eq!(config.eviction_mode, EvictionMode::Strict);
        assert_eq!(config.cache_domains.len(), 4);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("EVENT_MAX_AGE");
        env::remove_var("SECURITY_MAX_EVENTS");
        env::set_var("CACHE_EVICTION_MODE", "legacy");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.max_events, 10_000);
        assert_eq!(config.eviction_mode, EvictionMode::Legacy);

        env::set_var("CACHE_EVICTION_MODE", "not-a-mode");
        assert_eq!(Config::from_env().eviction_mode, EvictionMode::Strict);
        env::remove_var("CACHE_EVICTION_MODE");
    }

    #[test]
    fn test_zero_cleanup_interval_is_clamped() {
        let config = Config {
            cleanup_interval: 0,
            ..Config::default()
        };
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
    }
}
