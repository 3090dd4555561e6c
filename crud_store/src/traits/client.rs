//! Store client boundary
//!
//! This module defines the operation table a backing store has to provide.

use crate::errors::CrudError;
use crate::query_builder::{Filter, Projection, SortField};
use crate::traits::model::ModelSpec;
use crate::Row;
use async_trait::async_trait;

/// Arguments of a read query
#[derive(Debug, Clone, Default)]
pub struct FindArgs {
    pub filter: Filter,
    pub order_by: Vec<SortField>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub projection: Projection,
}

impl FindArgs {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn order_by(mut self, order_by: Vec<SortField>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

/// Per-model persistence operations.
///
/// Implementations are cheap handles: cloning shares the underlying pool or
/// in-memory tables. `begin` returns a handle bound to a fresh transaction;
/// every operation issued through that handle joins it until `commit` or
/// `rollback`.
#[async_trait]
pub trait StoreClient: Clone + Send + Sync + 'static {
    /// Insert one record and return it with store defaults applied
    async fn create(
        &self,
        spec: &ModelSpec,
        data: Row,
        projection: &Projection,
    ) -> Result<Row, CrudError>;

    /// Insert several records, returning how many were written
    async fn create_many(
        &self,
        spec: &ModelSpec,
        data: Vec<Row>,
        skip_duplicates: bool,
    ) -> Result<u64, CrudError>;

    /// Look up a record by a filter on unique columns
    async fn find_unique(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Row>, CrudError> {
        let args = FindArgs::new(filter.clone()).projection(projection.clone());
        self.find_first(spec, &args).await
    }

    async fn find_first(&self, spec: &ModelSpec, args: &FindArgs)
        -> Result<Option<Row>, CrudError>;

    async fn find_many(&self, spec: &ModelSpec, args: &FindArgs) -> Result<Vec<Row>, CrudError>;

    async fn count(&self, spec: &ModelSpec, filter: &Filter) -> Result<u64, CrudError>;

    /// Update the first matching record; `NotFound` when nothing matches
    async fn update(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        data: Row,
        projection: &Projection,
    ) -> Result<Row, CrudError>;

    async fn update_many(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        data: Row,
    ) -> Result<u64, CrudError>;

    /// Update the first match, or insert `create` when nothing matches
    async fn upsert(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        create: Row,
        update: Row,
        projection: &Projection,
    ) -> Result<Row, CrudError>;

    /// Remove the first matching record; `NotFound` when nothing matches
    async fn delete(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Row, CrudError>;

    async fn delete_many(&self, spec: &ModelSpec, filter: &Filter) -> Result<u64, CrudError>;

    async fn begin(&self) -> Result<Self, CrudError>;

    async fn commit(&self) -> Result<(), CrudError>;

    async fn rollback(&self) -> Result<(), CrudError>;

    fn in_transaction(&self) -> bool;
}
