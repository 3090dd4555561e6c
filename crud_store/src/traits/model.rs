//! Model metadata
//!
//! This module defines the compile-time description of a persisted record type.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Runtime copy of a model's metadata, handed to store clients on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Rust type name, used for error context
    pub name: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [&'static str],
    pub unique_columns: &'static [&'static str],
    pub soft_delete_column: &'static str,
    pub created_at_column: Option<&'static str>,
    pub updated_at_column: Option<&'static str>,
}

impl ModelSpec {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

/// Metadata about a persisted record type.
///
/// This trait should be derived with `#[derive(Model)]` or the `#[model]`
/// attribute macro from `model_derive`:
///
/// ```ignore
/// use model_derive::model;
///
/// #[model]
/// #[table(name = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: i64,
///     #[unique]
///     pub email: String,
///     pub name: String,
///     #[created_at]
///     pub created_at: DateTime<Utc>,
///     #[updated_at]
///     pub updated_at: DateTime<Utc>,
///     #[soft_delete]
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
pub trait Model:
    Clone + Send + Sync + Debug + Serialize + DeserializeOwned + Unpin + 'static
{
    /// The table name in the database
    fn table_name() -> &'static str;

    /// Persisted column names, in declaration order
    fn columns() -> &'static [&'static str];

    /// Rust type name
    fn model_name() -> &'static str;

    fn primary_key() -> &'static str {
        "id"
    }

    /// Columns carrying a unique constraint besides the primary key
    fn unique_columns() -> &'static [&'static str] {
        &[]
    }

    /// Nullable deletion timestamp column
    fn soft_delete_column() -> &'static str {
        "deleted_at"
    }

    fn created_at_column() -> Option<&'static str> {
        Some("created_at")
    }

    fn updated_at_column() -> Option<&'static str> {
        Some("updated_at")
    }

    fn spec() -> ModelSpec {
        ModelSpec {
            name: Self::model_name(),
            table: Self::table_name(),
            primary_key: Self::primary_key(),
            columns: Self::columns(),
            unique_columns: Self::unique_columns(),
            soft_delete_column: Self::soft_delete_column(),
            created_at_column: Self::created_at_column(),
            updated_at_column: Self::updated_at_column(),
        }
    }
}
