//! Generic repository
//!
//! `CrudRepository<T, C>` wraps a [`StoreClient`](crate::traits::StoreClient)
//! with model-aware defaults: soft-delete scoping on reads, camelCase sort
//! strings, pagination and transactions.

pub mod core;
mod delete;
mod read;
pub mod transaction;
mod write;


pub use self::core::{CrudRepository, DeleteMode, FindByIdScope, RepositorySettings};
pub use transaction::transaction;
