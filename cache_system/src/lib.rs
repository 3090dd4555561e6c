//! Cache system for Redis-based caching
//!
//! This crate provides the Redis cache service: plain and JSON values with TTLs,
//! `SET NX` locks and key/pattern/topic invalidation.

pub mod errors;
pub mod manager;
pub mod params;
pub mod prelude;

// Re-export centralized config
pub use config::CacheConfig;

pub use errors::CacheError;
pub use manager::{CacheManager, DEFAULT_LOCK_TTL};
pub use params::{CacheTopic, CacheTtl};
