//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and pluggable eviction.

mod entry;
mod policy;
mod registry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use policy::{select_victim, EvictionMode, EvictionPolicy};
pub use registry::{
    user_key, CacheDomain, CacheRegistry, ATTACHMENTS, KEY_SEPARATOR, STATS, TRANSACTIONS,
    USER_DATA,
};
pub use stats::CacheStats;
pub use store::{Cache, CacheConfig};
