//! Cache parameter types
//!
//! TTL presets and the topics accepted by topic-based invalidation.

use crate::errors::CacheError;
use std::fmt;
use std::str::FromStr;

/// Common TTL presets, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    TenSeconds,
    OneMinute,
    FiveMinutes,
    OneHour,
    OneDay,
    OneWeek,
}

impl CacheTtl {
    pub const fn seconds(self) -> u64 {
        match self {
            CacheTtl::TenSeconds => 10,
            CacheTtl::OneMinute => 60,
            CacheTtl::FiveMinutes => 5 * 60,
            CacheTtl::OneHour => 60 * 60,
            CacheTtl::OneDay => 60 * 60 * 24,
            CacheTtl::OneWeek => 7 * 24 * 60 * 60,
        }
    }
}

impl From<CacheTtl> for u64 {
    fn from(ttl: CacheTtl) -> Self {
        ttl.seconds()
    }
}

/// What `CacheManager::clear_by_topic` should remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheTopic {
    /// Every key in the current database
    All,
    /// A single key
    Key(String),
}

impl FromStr for CacheTopic {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(CacheError::UnknownTopic(s.to_string())),
            "all" => Ok(CacheTopic::All),
            key => Ok(CacheTopic::Key(key.to_string())),
        }
    }
}

impl fmt::Display for CacheTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTopic::All => write!(f, "all"),
            CacheTopic::Key(key) => write!(f, "{}", key),
        }
    }
}
