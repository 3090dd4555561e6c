//! Core crudbase functionality
//!
//! `CrudBase` is the composition root: it owns the PostgreSQL pool, the
//! optional cache service and the repository defaults, and hands out
//! repositories that share one client handle.

use cache_system::CacheManager;
use config::{AppConfig, DatabaseConfig};
use crud_store::{CrudError, CrudRepository, Model, PgClient, RepositorySettings};
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::CrudBaseError;

/// Owner of the connection pool and everything built on it
#[derive(Clone)]
pub struct CrudBase {
    client: PgClient,
    cache: Option<Arc<CacheManager>>,
    settings: RepositorySettings,
}

impl std::fmt::Debug for CrudBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudBase")
            .field("client", &self.client)
            .field("cache", &self.cache.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl CrudBase {
    /// Connect to PostgreSQL with default repository settings and no cache
    pub async fn new(config: DatabaseConfig) -> Result<Self, CrudBaseError> {
        let pool = connect(&config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Connect the pool and the cache service described by `config`
    pub async fn from_config(config: &AppConfig) -> Result<Self, CrudBaseError> {
        config.validate()?;
        let pool = connect(&config.database).await?;
        let cache = CacheManager::new(config.cache.clone())?;

        Ok(Self::from_pool(pool)
            .with_cache(cache)
            .with_settings(RepositorySettings::from(&config.repository)))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            client: PgClient::new(pool),
            cache: None,
            settings: RepositorySettings::default(),
        }
    }

    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn with_settings(mut self, settings: RepositorySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        self.client.pool()
    }

    pub fn client(&self) -> &PgClient {
        &self.client
    }

    pub fn cache(&self) -> Option<&Arc<CacheManager>> {
        self.cache.as_ref()
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// Repository for model `T` sharing this instance's client
    pub fn repository<T: Model>(&self) -> CrudRepository<T, PgClient> {
        CrudRepository::with_settings(self.client.clone(), self.settings.clone())
    }

    /// Run `work` in a database transaction; see [`crud_store::transaction`]
    pub async fn transaction<R, F, Fut>(&self, work: F) -> Result<R, CrudError>
    where
        F: FnOnce(PgClient) -> Fut,
        Fut: Future<Output = Result<R, CrudError>>,
    {
        crud_store::transaction(&self.client, work).await
    }

    /// Check database connection health, and the cache when one is configured
    pub async fn health_check(&self) -> Result<(), CrudBaseError> {
        sqlx::query("SELECT 1").fetch_one(self.pool()).await?;
        if let Some(cache) = &self.cache {
            cache.ping().await?;
        }
        Ok(())
    }

    /// Close the pool; repositories handed out earlier fail afterwards
    pub async fn close(&self) {
        tracing::info!("Closing database pool");
        self.pool().close().await;
    }
}

async fn connect(config: &DatabaseConfig) -> Result<PgPool, CrudBaseError> {
    let connection_string = config.connection_string();

    let mut pool_options = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

    // Set max lifetime if specified
    if config.max_lifetime_seconds > 0 {
        pool_options = pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
    }

    let pool = pool_options.connect(&connection_string).await.map_err(|e| {
        tracing::error!(host = %config.host, database = %config.database, "Failed to connect: {}", e);
        e
    })?;
    crate::debug_log!("Connected to PostgreSQL ({} max connections)", config.max_connections);
    Ok(pool)
}
