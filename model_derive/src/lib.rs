//! Procedural macros for crudbase models
//!
//! This crate provides the `Model` derive and the `#[model]` attribute macro,
//! which turn a plain struct into a `crud_store::Model` with its table
//! metadata checked at compile time. Expansions refer to `::crudbase`, so the
//! deriving crate needs `crudbase` as a dependency.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod generation;
mod model_macro;
mod parsing;

use generation::generate_model_impl;
use model_macro::model_attribute;
use parsing::parse_model;

/// Derive macro for the `Model` trait
///
/// Prefer the `#[model]` attribute macro, which adds this derive together
/// with the other derives a model needs.
///
/// ```ignore
/// #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Model)]
/// #[table(name = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: i64,
///     #[unique]
///     pub email: String,
///     pub created_at: DateTime<Utc>,
///     pub updated_at: DateTime<Utc>,
///     pub deleted_at: Option<DateTime<Utc>>,
///     #[relation]
///     pub posts: Option<Vec<Post>>,
/// }
/// ```
///
/// Field attributes:
/// - `#[primary_key]`: identifier column, defaults to a field named `id`
/// - `#[unique]`: column with a unique constraint
/// - `#[soft_delete]`: deletion timestamp, defaults to a field named `deleted_at`
/// - `#[created_at]` / `#[updated_at]`: store-managed timestamps, default to
///   fields with those names
/// - `#[relation]`: embedded related records, not a column
#[proc_macro_derive(
    Model,
    attributes(table, primary_key, unique, soft_delete, created_at, updated_at, relation)
)]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let info = match parse_model(&input) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    TokenStream::from(generate_model_impl(&input.ident, &info))
}

/// Convenience attribute macro that adds all necessary derives for a model
///
/// ```ignore
/// use crudbase::prelude::*;
///
/// #[model]
/// #[table(name = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: i64,
///     pub name: String,
///     pub created_at: DateTime<Utc>,
///     pub updated_at: DateTime<Utc>,
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}
