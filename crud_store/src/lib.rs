//! Crud Store - generic persistence layer for crudbase
//!
//! This crate provides model metadata, the store client boundary with its
//! PostgreSQL and in-memory implementations, query building blocks and the
//! generic `CrudRepository`.

/// Trace logging compiled in only with the `debug-logging` feature
#[cfg(feature = "debug-logging")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod client;
pub mod errors;
pub mod id_type;
pub mod prelude;
pub mod query_builder;
pub mod repository;
pub mod traits;
pub mod validation;

pub use client::{MemoryClient, PgClient};
pub use errors::CrudError;
pub use id_type::RecordId;
pub use query_builder::{
    parse_sort, BatchCount, CrudOptions, Filter, PaginationRequest, PaginationResult, Projection,
    QueryFilter, QueryOperator, Relation, SortField, SortOrder,
};
pub use repository::{
    transaction, CrudRepository, DeleteMode, FindByIdScope, RepositorySettings,
};
pub use traits::*;
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

/// A record as exchanged with store clients: column name to JSON value
pub type Row = serde_json::Map<String, serde_json::Value>;
