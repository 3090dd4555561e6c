//! Error types for the crudbase facade
//!
//! Member crates keep their own error enums; this one wraps them for callers
//! that go through `CrudBase`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrudBaseError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error(transparent)]
    Crud(#[from] crud_store::CrudError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache_system::CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
