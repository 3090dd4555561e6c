//! Cache error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The shared connection could not be opened or handed out
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timed out connecting to the cache")]
    Timeout,

    #[error("Unknown cache topic: {0:?}")]
    UnknownTopic(String),
}
