//! Pagination request and result types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest LIMIT/OFFSET PostgreSQL accepts
pub const MAX_ROW_BOUND: u64 = i64::MAX as u64;

/// Page request as it arrives from a caller.
///
/// Numbers and numeric strings are accepted; anything else, including
/// negative numbers, deserializes as absent and falls back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationRequest {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub sort: Option<String>,
}

impl PaginationRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    /// Effective page number; zero or absent means 1
    pub fn page(&self) -> u64 {
        match self.page {
            Some(page) if page > 0 => page,
            _ => DEFAULT_PAGE,
        }
    }

    /// Effective page size; zero or absent means 10
    pub fn page_size(&self) -> u64 {
        match self.page_size {
            Some(size) if size > 0 => size.min(MAX_ROW_BOUND),
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page() - 1)
            .saturating_mul(self.page_size())
            .min(MAX_ROW_BOUND)
    }

    /// Requested sort, if it is non-empty
    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref().filter(|sort| !sort.is_empty())
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.is_finite()).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// One page of rows plus the totals needed to render a pager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page_count: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> PaginationResult<T> {
    pub fn new(rows: Vec<T>, total: u64, page: u64, page_size: u64) -> Self {
        Self {
            rows,
            total,
            page_count: page_count(total, page_size),
            page,
            page_size,
        }
    }

    pub fn empty(page: u64, page_size: u64) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginationResult<U> {
        PaginationResult {
            rows: self.rows.into_iter().map(f).collect(),
            total: self.total,
            page_count: self.page_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

pub fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// Number of rows touched by a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCount {
    pub count: u64,
}

impl BatchCount {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}
