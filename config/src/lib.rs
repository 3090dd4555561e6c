//! # Configuration Management for crudbase
//!
//! This crate provides centralized configuration structures for all crudbase components:
//! the PostgreSQL pool, the Redis cache service and repository defaults.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CacheConfig, DatabaseConfig};
//!
//! let db_config = DatabaseConfig::new(
//!     "localhost".to_string(), 5432, "myapp".to_string(),
//!     "postgres".to_string(), "password".to_string(),
//!     1, 10, 30, 600, 3600,
//! );
//!
//! let cache_config = CacheConfig::new("localhost".to_string(), 6379, "myapp".to_string());
//! assert_eq!(cache_config.endpoint(), "localhost:6379");
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "myapp"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 10
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [cache]
//! host = "localhost"
//! port = 6379
//! key_prefix = "myapp"
//! use_tls = false
//! connection_timeout_ms = 10000
//! default_ttl_seconds = 3600
//!
//! [repository]
//! default_sort = "-createdAt"
//! snake_case_sort = true
//! find_by_id_includes_deleted = false
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // .env.dev / .env, then CRUDBASE_CONFIG or ./crudbase.toml, then env overrides
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./crudbase.toml";
const CONFIG_PATH_ENV: &str = "CRUDBASE_CONFIG";
const ENV_FILES: [&str; 2] = [".env.dev", ".env"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields
    #[serde(default)]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
}

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    /// Prepended to every key, like ioredis' `keyPrefix`
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
}

/// Defaults applied by every repository built from the composition root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_sort")]
    pub default_sort: String,
    #[serde(default = "default_true")]
    pub snake_case_sort: bool,
    #[serde(default)]
    pub find_by_id_includes_deleted: bool,
}

fn default_redis_port() -> u16 {
    6379
}

fn default_connection_timeout_ms() -> u64 {
    10_000
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_sort() -> String {
    "-createdAt".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_sort: default_sort(),
            snake_case_sort: true,
            find_by_id_includes_deleted: false,
        }
    }
}

impl AppConfig {
    /// Load configuration: `.env.dev` and `.env` (both optional), then the TOML file named by
    /// `CRUDBASE_CONFIG` or `./crudbase.toml`, then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        for file in ENV_FILES {
            if let Err(e) = dotenvy::from_filename(file) {
                if !e.not_found() {
                    return Err(e.into());
                }
            }
        }

        let mut config = if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::read_file(&config_path)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::read_file(DEFAULT_CONFIG_PATH)?
        } else {
            return Err(ConfigError::Invalid(format!(
                "Config path must be specified as {} or in {} file",
                CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH
            )));
        };

        config.apply_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides using the variable names of the original deployment
    /// (`DATABASE_URL`, `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD`, `REDIS_PREFIX`, `REDIS_USETLS`).
    /// `lookup` is usually `std::env::var(..).ok()`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(host) = lookup("REDIS_HOST") {
            self.cache.host = host;
        }
        if let Some(port) = lookup("REDIS_PORT") {
            // parseInt(..) || 6379 in the original: unparsable ports fall back
            self.cache.port = port.trim().parse().unwrap_or(default_redis_port());
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            self.cache.password = Some(password).filter(|p| !p.is_empty());
        }
        if let Some(prefix) = lookup("REDIS_PREFIX") {
            self.cache.key_prefix = prefix;
        }
        if let Some(use_tls) = lookup("REDIS_USETLS") {
            self.cache.use_tls = match use_tls.trim() {
                "true" => true,
                "false" | "" => false,
                other => {
                    return Err(ConfigError::InvalidEnv {
                        name: "REDIS_USETLS".to_string(),
                        value: other.to_string(),
                    })
                }
            };
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Database validations
        let has_url = self.database.url.as_deref().is_some_and(|u| !u.is_empty());
        if !has_url {
            if self.database.host.is_empty() {
                return Err(ConfigError::Invalid(
                    "Database host cannot be empty".to_string(),
                ));
            }
            if self.database.port == 0 {
                return Err(ConfigError::Invalid(
                    "Database port cannot be zero".to_string(),
                ));
            }
            if self.database.database.is_empty() {
                return Err(ConfigError::Invalid(
                    "Database name cannot be empty".to_string(),
                ));
            }
            if self.database.username.is_empty() {
                return Err(ConfigError::Invalid(
                    "Database username cannot be empty".to_string(),
                ));
            }
        }
        if self.database.min_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database min_connections must be greater than 0".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "Database min_connections cannot be greater than max_connections".to_string(),
            ));
        }
        if self.database.connection_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Database connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        // Cache validations
        if self.cache.host.is_empty() {
            return Err(ConfigError::Invalid("Redis host cannot be empty".to_string()));
        }
        if self.cache.port == 0 {
            return Err(ConfigError::Invalid("Redis port cannot be zero".to_string()));
        }
        if self.cache.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache connection_timeout_ms must be greater than 0".to_string(),
            ));
        }

        // Repository validations
        if self.repository.default_sort.len() > 60 {
            return Err(ConfigError::Invalid(
                "Repository default_sort cannot exceed 60 characters".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            url: None,
            host,
            port,
            database,
            username,
            password,
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
        }
    }

    /// Build connection string
    pub fn connection_string(&self) -> String {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            ),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default timeouts and no password
    pub fn new(host: String, port: u16, key_prefix: String) -> Self {
        Self {
            host,
            port,
            password: None,
            key_prefix,
            use_tls: false,
            connection_timeout_ms: default_connection_timeout_ms(),
            default_ttl_seconds: default_ttl_seconds(),
        }
    }

    pub fn with_password(mut self, password: String) -> Self {
        self.password = Some(password);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// `host:port`, safe to log
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Password to authenticate with; an empty string counts as none
    pub fn auth_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|password| !password.is_empty())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new("localhost".to_string(), default_redis_port(), String::new())
    }
}
