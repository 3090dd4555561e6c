//! Convenience re-exports for common crudbase usage
//!
//! # Example
//!
//! ```rust
//! use crudbase::prelude::*;
//!
//! let options = CrudOptions::new().order_by("-createdAt").with_deleted();
//! assert!(options.with_deleted);
//! ```

// Core crudbase components
pub use crate::core::CrudBase;
pub use crate::errors::CrudBaseError;
pub use crate::operation_result::OperationResult;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, DatabaseConfig, RepositoryConfig};

// Repositories, clients, queries
pub use crud_store::prelude::*;
pub use crud_store;

// Re-export cache system
pub use cache_system::prelude::*;

// Model derive; the trait of the same name comes from crud_store
pub use model_derive::{model, Model};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;

pub use sqlx::PgPool;
