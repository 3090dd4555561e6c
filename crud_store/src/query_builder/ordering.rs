//! Sort specifications
//!
//! Sort strings are comma-separated field names, `-` marking descending order:
//! `"-createdAt,name"` sorts newest first, then by name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One key of a multi-key ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: SortOrder::Desc,
        }
    }
}

/// Parse a sort string into ordered keys.
///
/// Tokens keep their input order, which is also their tie-break precedence.
/// Returns `None` when the input holds no tokens.
pub fn parse_sort(input: &str, to_snake: bool) -> Option<Vec<SortField>> {
    let fields: Vec<SortField> = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let (name, order) = match token.strip_prefix('-') {
                Some(rest) => (rest, SortOrder::Desc),
                None => (token, SortOrder::Asc),
            };
            if name.is_empty() {
                return None;
            }
            let field = if to_snake {
                to_snake_case(name)
            } else {
                name.to_string()
            };
            Some(SortField { field, order })
        })
        .collect();

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

/// `createdAt` -> `created_at`; every uppercase letter gets an underscore prefix
pub fn to_snake_case(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            snake.push('_');
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}
