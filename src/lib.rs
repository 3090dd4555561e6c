//! # crudbase
//!
//! Generic, paginated, soft-delete aware CRUD repositories over PostgreSQL,
//! with a Redis cache service and structured operation results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crudbase::prelude::*;
//!
//! #[model]
//! #[table(name = "users")]
//! pub struct User {
//!     pub id: i64,
//!     #[unique]
//!     pub email: String,
//!     pub name: String,
//!     pub created_at: DateTime<Utc>,
//!     pub updated_at: DateTime<Utc>,
//!     pub deleted_at: Option<DateTime<Utc>>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let crudbase = CrudBase::from_config(&config).await?;
//!
//!     let users = crudbase.repository::<User>();
//!     let created = users
//!         .create(&json!({"email": "ada@example.com", "name": "Ada"}), &CrudOptions::default())
//!         .await?;
//!
//!     let page = users
//!         .paginated(&PaginationRequest::new(1, 10), &Filter::new(), &CrudOptions::default())
//!         .await?;
//!     println!("{} of {} users, first is {}", page.rows.len(), page.total, created.name);
//!
//!     users.delete_by_id(created.id, DeleteMode::Soft, &CrudOptions::default()).await?;
//!     crudbase.close().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod operation_result;
pub mod prelude;

// Re-export the main public types for convenience
pub use self::core::CrudBase;
pub use errors::CrudBaseError;
pub use operation_result::OperationResult;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, DatabaseConfig, RepositoryConfig};

// Re-export internal crates used by macros and public API
pub use cache_system;
pub use crud_store;
pub use model_derive;

// Paths used by `#[model]` expansions
pub use serde;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
