//! Common imports for working with repositories

pub use crate::client::{MemoryClient, PgClient};
pub use crate::errors::CrudError;
pub use crate::id_type::RecordId;
pub use crate::query_builder::{
    BatchCount, CrudOptions, Filter, PaginationRequest, PaginationResult, QueryFilter, Relation,
    SortOrder,
};
pub use crate::repository::{transaction, CrudRepository, DeleteMode, FindByIdScope, RepositorySettings};
pub use crate::traits::{FindArgs, Model, ModelSpec, StoreClient};
pub use crate::Row;

pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use serde_json::{json, Value};
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
