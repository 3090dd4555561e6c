//! Query building blocks
//!
//! Filters, sort parsing, pagination, per-call options and SQL generation.

pub mod filter;
pub mod options;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;

#[cfg(test)]
mod tests;

pub use filter::{Filter, LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use options::{CrudOptions, Projection, Relation};
pub use ordering::{parse_sort, to_snake_case, SortField, SortOrder};
pub use pagination::{BatchCount, PaginationRequest, PaginationResult};
pub use sql_generation::{SqlGenerator, Statement};
