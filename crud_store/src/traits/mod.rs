//! Traits for data access
//!
//! `Model` describes a record type, `StoreClient` is the boundary every
//! backing store implements.

pub mod client;
pub mod model;

pub use client::{FindArgs, StoreClient};
pub use model::{Model, ModelSpec};
