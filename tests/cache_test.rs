//! Integration tests against Redis
//!
//! Run with a local Redis (or `REDIS_HOST`/`REDIS_PORT`): `cargo test -- --ignored`.

use crudbase::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Session {
    user_id: i64,
    roles: Vec<String>,
}

fn manager() -> anyhow::Result<CacheManager> {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6379);
    Ok(CacheManager::new(CacheConfig::new(host, port, "crudbase_test".to_string()))?)
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_values_and_json() -> anyhow::Result<()> {
    let cache = manager()?;
    cache.ping().await?;

    cache.set_value("greeting", "hello", None).await?;
    assert_eq!(cache.get_value("greeting").await?.as_deref(), Some("hello"));

    let session = Session {
        user_id: 7,
        roles: vec!["admin".to_string()],
    };
    cache.set_json("session:7", &session, Some(CacheTtl::OneMinute.seconds())).await?;
    assert_eq!(cache.get_json::<Session>("session:7").await?, Some(session));

    assert_eq!(cache.clear_by_pattern("session:*").await?, 1);
    assert!(cache.clear_by_key("greeting").await?);
    assert_eq!(cache.get_value("greeting").await?, None);
    Ok(())
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_locks() -> anyhow::Result<()> {
    let cache = manager()?;
    cache.clear_by_key("lock:report").await?;

    let token = cache.try_lock("lock:report", 30).await?;
    assert!(token.is_some());
    assert!(cache.try_lock("lock:report", 30).await?.is_none());

    assert!(!cache.unlock_if_owner("lock:report", "someone-else").await?);
    if let Some(token) = token {
        assert!(cache.unlock_if_owner("lock:report", &token).await?);
    }
    assert!(cache.lock("lock:report", "manual", 30).await?);
    assert!(cache.unlock("lock:report").await?);

    assert!(cache.lock_default("lock:report", "manual").await?);
    assert!(!cache.lock_default("lock:report", "other").await?);
    let ttl: i64 = cache.ttl("lock:report").await?;
    assert!(ttl > 30 && ttl <= DEFAULT_LOCK_TTL as i64);
    assert!(cache.unlock("lock:report").await?);
    Ok(())
}
