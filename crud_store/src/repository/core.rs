use crate::errors::CrudError;
use crate::id_type::RecordId;
use crate::query_builder::{parse_sort, Filter, SortField};
use crate::traits::{Model, ModelSpec, StoreClient};
use crate::Row;
use config::RepositoryConfig;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// Which rows `find_by_id` may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FindByIdScope {
    /// Skip soft-deleted rows unless `with_deleted` is set, like every other read
    #[default]
    ActiveOnly,
    /// Never filter on the soft-delete column
    AllRows,
}

/// Whether deletes mark rows or remove them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Set the soft-delete column to the current time
    #[default]
    Soft,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    /// Sort applied by `find_all` and `paginated` when the caller gives none
    pub default_sort: String,
    /// Convert camelCase sort fields to snake_case column names
    pub snake_case_sort: bool,
    pub find_by_id_scope: FindByIdScope,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            default_sort: "-createdAt".to_string(),
            snake_case_sort: true,
            find_by_id_scope: FindByIdScope::ActiveOnly,
        }
    }
}

impl From<&RepositoryConfig> for RepositorySettings {
    fn from(config: &RepositoryConfig) -> Self {
        Self {
            default_sort: config.default_sort.clone(),
            snake_case_sort: config.snake_case_sort,
            find_by_id_scope: if config.find_by_id_includes_deleted {
                FindByIdScope::AllRows
            } else {
                FindByIdScope::ActiveOnly
            },
        }
    }
}

/// Generic CRUD repository for model `T` over store client `C`
pub struct CrudRepository<T: Model, C: StoreClient> {
    pub(crate) client: C,
    pub(crate) settings: RepositorySettings,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Model, C: StoreClient> Clone for CrudRepository<T, C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            settings: self.settings.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Model, C: StoreClient> std::fmt::Debug for CrudRepository<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudRepository")
            .field("model", &T::model_name())
            .field("table", &T::table_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl<T: Model, C: StoreClient> CrudRepository<T, C> {
    pub fn new(client: C) -> Self {
        Self::with_settings(client, RepositorySettings::default())
    }

    pub fn with_settings(client: C, settings: RepositorySettings) -> Self {
        Self {
            client,
            settings,
            _phantom: PhantomData,
        }
    }

    /// Same repository over another handle, typically a transaction
    pub fn bind(&self, client: C) -> Self {
        Self::with_settings(client, self.settings.clone())
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    pub(crate) fn spec(&self) -> ModelSpec {
        T::spec()
    }

    pub(crate) fn sort_fields(&self, sort: &str) -> Vec<SortField> {
        parse_sort(sort, self.settings.snake_case_sort).unwrap_or_default()
    }

    pub(crate) fn id_filter(&self, id: RecordId) -> Filter {
        Filter::new().eq(T::primary_key(), id.to_value())
    }

    pub(crate) fn to_row<D: Serialize + ?Sized>(&self, data: &D) -> Result<Row, CrudError> {
        match serde_json::to_value(data)? {
            Value::Object(row) => Ok(row),
            _ => Err(CrudError::validation(
                T::model_name(),
                "data",
                "record data must serialize to an object",
            )),
        }
    }

    pub(crate) fn from_row(&self, row: Row) -> Result<T, CrudError> {
        Ok(serde_json::from_value(Value::Object(row))?)
    }
}
