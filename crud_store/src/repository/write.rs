//! Create and update operations

use super::core::CrudRepository;
use crate::errors::CrudError;
use crate::id_type::RecordId;
use crate::query_builder::{BatchCount, CrudOptions, Filter, QueryFilter};
use crate::traits::{Model, StoreClient};
use serde::Serialize;

impl<T: Model, C: StoreClient> CrudRepository<T, C> {
    /// Insert one record and return it as stored
    pub async fn create<D>(&self, data: &D, options: &CrudOptions) -> Result<T, CrudError>
    where
        D: Serialize + Sync + ?Sized,
    {
        let row = self.to_row(data)?;
        let created = self
            .client
            .create(&self.spec(), row, &options.projection())
            .await?;
        self.from_row(created)
    }

    /// Insert several records.
    ///
    /// With `options.skip_duplicates` rows colliding on a unique column are
    /// skipped and left out of the count; otherwise the first collision fails
    /// the whole batch.
    pub async fn create_many<D>(&self, data: &[D], options: &CrudOptions) -> Result<BatchCount, CrudError>
    where
        D: Serialize + Sync,
    {
        let rows = data
            .iter()
            .map(|item| self.to_row(item))
            .collect::<Result<Vec<_>, _>>()?;
        let count = self
            .client
            .create_many(&self.spec(), rows, options.skip_duplicates)
            .await?;
        Ok(BatchCount::new(count))
    }

    /// Update a live record by primary key.
    ///
    /// Soft-deleted rows are never matched, whatever `with_deleted` says.
    pub async fn update_by_id<D>(
        &self,
        id: impl Into<RecordId>,
        data: &D,
        options: &CrudOptions,
    ) -> Result<T, CrudError>
    where
        D: Serialize + Sync + ?Sized,
    {
        let filter = self.id_filter(id.into()).scoped(T::soft_delete_column(), false);
        let row = self.to_row(data)?;
        let updated = self
            .client
            .update(&self.spec(), &filter, row, &options.projection())
            .await?;
        self.from_row(updated)
    }

    /// Update the first record matching `filter`
    pub async fn update_one<D>(&self, filter: &Filter, data: &D, options: &CrudOptions) -> Result<T, CrudError>
    where
        D: Serialize + Sync + ?Sized,
    {
        let filter = filter.scoped(T::soft_delete_column(), options.with_deleted);
        let row = self.to_row(data)?;
        let updated = self
            .client
            .update(&self.spec(), &filter, row, &options.projection())
            .await?;
        self.from_row(updated)
    }

    /// Apply the same update to every record matching `filter`
    pub async fn bulk_update<D>(&self, filter: &Filter, data: &D, options: &CrudOptions) -> Result<BatchCount, CrudError>
    where
        D: Serialize + Sync + ?Sized,
    {
        let filter = filter.scoped(T::soft_delete_column(), options.with_deleted);
        let row = self.to_row(data)?;
        let count = self.client.update_many(&self.spec(), &filter, row).await?;
        Ok(BatchCount::new(count))
    }

    /// Apply the same update to the records with the given ids.
    ///
    /// An empty id list is rejected before the store is touched.
    pub async fn bulk_update_by_ids<I, D>(
        &self,
        ids: &[I],
        data: &D,
        options: &CrudOptions,
    ) -> Result<BatchCount, CrudError>
    where
        I: Clone + Into<RecordId> + Sync,
        D: Serialize + Sync + ?Sized,
    {
        if ids.is_empty() {
            return Err(CrudError::validation(
                T::model_name(),
                "ids",
                "ids must be a non-empty list",
            ));
        }
        let values = ids
            .iter()
            .map(|id| Into::<RecordId>::into(id.clone()).to_value())
            .collect();
        let filter = Filter::new().and(QueryFilter::in_values(T::primary_key(), values));
        self.bulk_update(&filter, data, options).await
    }

    /// Update the first match of `filter`, or insert `create` when there is none.
    ///
    /// Soft-deleted rows count as matches.
    pub async fn upsert<A, B>(
        &self,
        filter: &Filter,
        create: &A,
        update: &B,
        options: &CrudOptions,
    ) -> Result<T, CrudError>
    where
        A: Serialize + Sync + ?Sized,
        B: Serialize + Sync + ?Sized,
    {
        let create = self.to_row(create)?;
        let update = self.to_row(update)?;
        let row = self
            .client
            .upsert(&self.spec(), filter, create, update, &options.projection())
            .await?;
        self.from_row(row)
    }
}
