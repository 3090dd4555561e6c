//! Cache manager implementation
//!
//! This module provides the main CacheManager struct
//! for Redis operations and connection management.

use crate::errors::CacheError;
use crate::params::CacheTopic;
use config::CacheConfig;
use rand::Rng;
use redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Default lock lifetime in seconds
pub const DEFAULT_LOCK_TTL: u64 = 300;

const SCAN_BATCH: usize = 200;

const UNLOCK_IF_OWNER: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

/// Connection settings built field by field, so passwords need no URL escaping
fn connection_info(config: &CacheConfig) -> ConnectionInfo {
    let addr = if config.use_tls {
        ConnectionAddr::TcpTls {
            host: config.host.clone(),
            port: config.port,
            insecure: false,
            tls_params: None,
        }
    } else {
        ConnectionAddr::Tcp(config.host.clone(), config.port)
    };

    ConnectionInfo {
        addr,
        redis: RedisConnectionInfo {
            password: config.auth_password().map(str::to_string),
            ..Default::default()
        },
    }
}

/// Redis-based cache manager
#[derive(Clone)]
pub struct CacheManager {
    client: Arc<Client>,
    config: Arc<CacheConfig>,
    connection_pool: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = {
            match self.connection_pool.try_read() {
                Ok(pool) => {
                    if pool.is_some() {
                        "connected"
                    } else {
                        "no_connection"
                    }
                }
                Err(_) => "lock_error",
            }
        };

        f.debug_struct("CacheManager")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("key_prefix", &self.config.key_prefix)
            .field("connected", &connection_status)
            .finish()
    }
}

impl CacheManager {
    /// Create a new cache manager. The connection is opened lazily on first use.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(connection_info(&config))?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection_pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get or create Redis connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        if let Some(connection) = self.connection_pool.read().await.as_ref() {
            return Ok(connection.clone());
        }

        let mut pool = self.connection_pool.write().await;

        if pool.is_none() {
            let timeout = Duration::from_millis(self.config.connection_timeout_ms);
            let connection =
                match tokio::time::timeout(timeout, self.client.get_multiplexed_async_connection())
                    .await
                {
                    Ok(Ok(connection)) => connection,
                    Ok(Err(e)) => {
                        tracing::error!("Could not connect to Redis cache instance: {}", e);
                        return Err(e.into());
                    }
                    Err(_) => {
                        tracing::error!(
                            "Could not connect to Redis cache instance: timed out after {:?}",
                            timeout
                        );
                        return Err(CacheError::Timeout);
                    }
                };
            tracing::debug!(host = %self.config.host, port = self.config.port, "Redis connection established");
            *pool = Some(connection);
        }

        Ok(pool
            .as_ref()
            .ok_or_else(|| CacheError::Connection("Failed to get connection from pool".into()))?
            .clone())
    }

    /// Apply the configured key prefix
    pub fn build_key(&self, key: &str) -> String {
        let mut full_key = String::with_capacity(self.config.key_prefix.len() + key.len());
        full_key.push_str(&self.config.key_prefix);
        full_key.push_str(key);
        full_key
    }

    /// Get a raw string value
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        let value: Option<String> = conn.get(&cache_key).await?;
        Ok(value)
    }

    /// Set a raw string value. `None` or `Some(0)` stores without expiry.
    pub async fn set_value(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<(), CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        match ttl_seconds {
            Some(ttl) if ttl > 0 => {
                let _: () = conn.set_ex(&cache_key, value, ttl).await?;
            }
            _ => {
                let _: () = conn.set(&cache_key, value).await?;
            }
        }
        Ok(())
    }

    /// Get a JSON value and deserialize it
    pub async fn get_json<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        match self.get_value(key).await? {
            Some(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            None => Ok(None),
        }
    }

    /// Serialize a value as JSON and store it
    pub async fn set_json<T>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let json_str = serde_json::to_string(value)?;
        self.set_value(key, &json_str, ttl_seconds).await
    }

    /// Acquire a lock with `SET key value EX ttl NX`. Returns whether the lock was taken.
    pub async fn lock(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<bool, CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(&cache_key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        let acquired = reply.is_some();
        tracing::trace!("lock {} acquired={}", cache_key, acquired);
        Ok(acquired)
    }

    /// `lock` with the default lifetime of five minutes
    pub async fn lock_default(&self, key: &str, value: &str) -> Result<bool, CacheError> {
        self.lock(key, value, DEFAULT_LOCK_TTL).await
    }

    /// Acquire a lock holding a random owner token. Returns the token when acquired.
    pub async fn try_lock(&self, key: &str, ttl_seconds: u64) -> Result<Option<String>, CacheError> {
        let token = Self::lock_token();
        if self.lock(key, &token, ttl_seconds).await? {
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    /// Release a lock unconditionally
    pub async fn unlock(&self, key: &str) -> Result<bool, CacheError> {
        self.clear_by_key(key).await
    }

    /// Release a lock only if it is still held with `token`
    pub async fn unlock_if_owner(&self, key: &str, token: &str) -> Result<bool, CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        let removed: i64 = redis::Script::new(UNLOCK_IF_OWNER)
            .key(&cache_key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    /// Remaining lifetime of a key in seconds; -1 without expiry, -2 when missing
    pub async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;
        Ok(conn.ttl(&cache_key).await?)
    }

    /// Delete a single key
    pub async fn clear_by_key(&self, key: &str) -> Result<bool, CacheError> {
        let cache_key = self.build_key(key);
        let mut conn = self.get_connection().await?;

        let deleted: i64 = conn.del(&cache_key).await?;
        Ok(deleted > 0)
    }

    /// Delete every key matching `pattern` (prefix applied), scanning in batches.
    /// Returns the number of keys removed.
    pub async fn clear_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let match_pattern = self.build_key(pattern);
        let mut conn = self.get_connection().await?;

        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                // Keys come back fully qualified, so they are deleted as-is
                let mut pipeline = redis::pipe();
                for key in &keys {
                    pipeline.del(key).ignore();
                }
                let _: () = pipeline.query_async(&mut conn).await?;
                removed += keys.len() as u64;
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        tracing::debug!("Cleared {} cache keys matching {}", removed, match_pattern);
        Ok(removed)
    }

    /// Clear by topic: `All` flushes the database (falling back to a full pattern scan if
    /// FLUSHDB is refused), `Key` deletes that key.
    pub async fn clear_by_topic(&self, topic: &CacheTopic) -> Result<(), CacheError> {
        match topic {
            CacheTopic::All => {
                let mut conn = self.get_connection().await?;
                let flushed: Result<(), redis::RedisError> =
                    redis::cmd("FLUSHDB").query_async(&mut conn).await;
                if let Err(e) = flushed {
                    tracing::warn!("FLUSHDB failed ({}), clearing by pattern instead", e);
                    self.clear_by_pattern("*").await?;
                }
                Ok(())
            }
            CacheTopic::Key(key) => {
                self.clear_by_key(key).await?;
                Ok(())
            }
        }
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<String, CacheError> {
        let mut conn = self.get_connection().await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock_token() -> String {
        let token: u128 = rand::rng().random();
        format!("{:032x}", token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CacheTtl;

    fn manager(prefix: &str) -> CacheManager {
        CacheManager::new(CacheConfig::new(
            "localhost".to_string(),
            6379,
            prefix.to_string(),
        ))
        .unwrap()
    }

    #[test]
    fn test_build_key_applies_prefix() {
        assert_eq!(manager("app:").build_key("users:1"), "app:users:1");
        assert_eq!(manager("").build_key("users:1"), "users:1");
    }

    #[test]
    fn test_lock_tokens_are_unique_hex() {
        let a = CacheManager::lock_token();
        let b = CacheManager::lock_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_connection_info_keeps_password_verbatim() {
        let config = CacheConfig::new("redis.internal".to_string(), 6380, String::new())
            .with_password("p@ss/word".to_string())
            .with_tls(true);

        let info = connection_info(&config);
        assert!(matches!(
            &info.addr,
            ConnectionAddr::TcpTls { host, port: 6380, insecure: false, .. } if host == "redis.internal"
        ));
        assert_eq!(info.redis.password.as_deref(), Some("p@ss/word"));
        assert_eq!(info.redis.db, 0);

        assert!(CacheManager::new(config).is_ok());
    }

    #[test]
    fn test_connection_info_plain_tcp_without_password() {
        let config = CacheConfig::new("localhost".to_string(), 6379, String::new())
            .with_password(String::new());

        let info = connection_info(&config);
        assert!(matches!(&info.addr, ConnectionAddr::Tcp(host, 6379) if host == "localhost"));
        assert_eq!(info.redis.password, None);
    }

    #[test]
    fn test_debug_reports_disconnected_before_first_use() {
        let debug = format!("{:?}", manager("p:"));
        assert!(debug.contains("no_connection"));
        assert!(debug.contains("p:"));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at localhost:6379"]
    async fn test_lock_roundtrip_against_redis() {
        let cache = manager("crudbase-test:");
        cache.clear_by_key("lock:job").await.unwrap();

        let token = cache.try_lock("lock:job", CacheTtl::TenSeconds.seconds()).await.unwrap();
        assert!(token.is_some());
        assert!(!cache.lock("lock:job", "other", 10).await.unwrap());
        assert!(!cache.unlock_if_owner("lock:job", "other").await.unwrap());
        assert!(cache.unlock_if_owner("lock:job", &token.unwrap()).await.unwrap());

        cache.set_json("value", &vec![1, 2, 3], Some(10)).await.unwrap();
        let value: Option<Vec<i32>> = cache.get_json("value").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
        assert_eq!(cache.clear_by_pattern("*").await.unwrap(), 1);
    }
}
