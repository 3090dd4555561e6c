//! Delete operations
//!
//! A soft delete stamps the soft-delete column and only ever touches rows
//! that are still live. A hard delete removes rows whether or not they were
//! soft-deleted before. `with_deleted` has no effect here.

use super::core::{CrudRepository, DeleteMode};
use crate::client::timestamp_now;
use crate::errors::CrudError;
use crate::id_type::RecordId;
use crate::query_builder::{BatchCount, CrudOptions, Filter};
use crate::traits::{Model, StoreClient};
use crate::Row;

impl<T: Model, C: StoreClient> CrudRepository<T, C> {
    fn tombstone(&self) -> Row {
        let mut row = Row::new();
        row.insert(T::soft_delete_column().to_string(), timestamp_now());
        row
    }

    /// Delete a record by primary key and return it
    pub async fn delete_by_id(
        &self,
        id: impl Into<RecordId>,
        mode: DeleteMode,
        options: &CrudOptions,
    ) -> Result<T, CrudError> {
        let filter = self.id_filter(id.into());
        self.delete_first(filter, mode, options).await
    }

    /// Delete the first record matching `filter` and return it
    pub async fn delete_one(&self, filter: &Filter, mode: DeleteMode, options: &CrudOptions) -> Result<T, CrudError> {
        self.delete_first(filter.clone(), mode, options).await
    }

    async fn delete_first(&self, filter: Filter, mode: DeleteMode, options: &CrudOptions) -> Result<T, CrudError> {
        let spec = self.spec();
        let projection = options.projection();
        let row = match mode {
            DeleteMode::Soft => {
                let filter = filter.scoped(T::soft_delete_column(), false);
                self.client
                    .update(&spec, &filter, self.tombstone(), &projection)
                    .await?
            }
            DeleteMode::Hard => self.client.delete(&spec, &filter, &projection).await?,
        };
        trace_log!("deleted one {} ({:?})", T::table_name(), mode);
        self.from_row(row)
    }

    /// Delete every record matching `filter`
    pub async fn delete_many(&self, filter: &Filter, mode: DeleteMode) -> Result<BatchCount, CrudError> {
        let spec = self.spec();
        let count = match mode {
            DeleteMode::Soft => {
                let filter = filter.scoped(T::soft_delete_column(), false);
                self.client
                    .update_many(&spec, &filter, self.tombstone())
                    .await?
            }
            DeleteMode::Hard => self.client.delete_many(&spec, filter).await?,
        };
        Ok(BatchCount::new(count))
    }
}
