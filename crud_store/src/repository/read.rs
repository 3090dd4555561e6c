//! Read operations

use super::core::{CrudRepository, FindByIdScope};
use crate::errors::CrudError;
use crate::id_type::RecordId;
use crate::query_builder::{CrudOptions, Filter, PaginationRequest, PaginationResult};
use crate::traits::{FindArgs, Model, StoreClient};

impl<T: Model, C: StoreClient> CrudRepository<T, C> {
    /// Look up a record by primary key
    pub async fn find_by_id(
        &self,
        id: impl Into<RecordId>,
        options: &CrudOptions,
    ) -> Result<Option<T>, CrudError> {
        let filter = self.id_filter(id.into());
        let filter = match self.settings.find_by_id_scope {
            FindByIdScope::ActiveOnly => filter.scoped(T::soft_delete_column(), options.with_deleted),
            FindByIdScope::AllRows => filter,
        };

        let row = self
            .client
            .find_unique(&self.spec(), &filter, &options.projection())
            .await?;
        row.map(|row| self.from_row(row)).transpose()
    }

    /// First record matching `filter`
    pub async fn find_one(&self, filter: &Filter, options: &CrudOptions) -> Result<Option<T>, CrudError> {
        let mut args = FindArgs::new(filter.scoped(T::soft_delete_column(), options.with_deleted))
            .projection(options.projection());
        if let Some(sort) = &options.order_by {
            args = args.order_by(self.sort_fields(sort));
        }

        let row = self.client.find_first(&self.spec(), &args).await?;
        row.map(|row| self.from_row(row)).transpose()
    }

    /// Every record matching `filter`, ordered by `options.order_by` or the default sort.
    /// An empty `order_by` counts as absent.
    pub async fn find_all(&self, filter: &Filter, options: &CrudOptions) -> Result<Vec<T>, CrudError> {
        let sort = options
            .order_by
            .as_deref()
            .filter(|sort| !sort.is_empty())
            .unwrap_or(&self.settings.default_sort);
        let args = FindArgs::new(filter.scoped(T::soft_delete_column(), options.with_deleted))
            .order_by(self.sort_fields(sort))
            .projection(options.projection());

        trace_log!("find_all {} order={}", T::table_name(), sort);
        let rows = self.client.find_many(&self.spec(), &args).await?;
        rows.into_iter().map(|row| self.from_row(row)).collect()
    }

    /// One page of matching records.
    ///
    /// The total is counted first; an empty result returns without a row query.
    pub async fn paginated(
        &self,
        request: &PaginationRequest,
        filter: &Filter,
        options: &CrudOptions,
    ) -> Result<PaginationResult<T>, CrudError> {
        let page = request.page();
        let page_size = request.page_size();
        let filter = filter.scoped(T::soft_delete_column(), options.with_deleted);
        let spec = self.spec();

        let total = self.client.count(&spec, &filter).await?;
        if total == 0 {
            return Ok(PaginationResult::empty(page, page_size));
        }

        let sort = request.sort().unwrap_or(&self.settings.default_sort);
        let args = FindArgs::new(filter)
            .order_by(self.sort_fields(sort))
            .skip(request.skip())
            .take(page_size)
            .projection(options.projection());

        trace_log!("paginated {} page={} size={} total={}", T::table_name(), page, page_size, total);
        let rows = self
            .client
            .find_many(&spec, &args)
            .await?
            .into_iter()
            .map(|row| self.from_row(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PaginationResult::new(rows, total, page, page_size))
    }

    pub async fn count(&self, filter: &Filter, options: &CrudOptions) -> Result<u64, CrudError> {
        let filter = filter.scoped(T::soft_delete_column(), options.with_deleted);
        self.client.count(&self.spec(), &filter).await
    }
}
