//! Rate Limiter Module
//!
//! Fixed-window admission control per identifier, escalating to timed blocks
//! for repeat offenders.

mod config;
mod rate_limiter;


pub use config::{
    action_identifier, login_identifier, BlockTier, BlockTiers, RateLimitConfig, RateLimitPreset,
};
pub use rate_limiter::{
    BlockRecord, RateLimitDecision, RateLimitEntry, RateLimitStatus, RateLimiter,
};
