//! Query filters
//!
//! `QueryFilter` is a single condition or a nested AND/OR group; `Filter` is
//! the AND-combined list the repository and store clients pass around.

use crate::errors::CrudError;
use serde_json::{Map, Value};

/// Query condition operators
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    Like,      // LIKE
    ILike,     // ILIKE (case insensitive)
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

/// Single condition in WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    pub field: String,
    pub operator: QueryOperator,
    pub value: Option<Value>, // None for IS NULL/IS NOT NULL
}

/// Logical operators for combining conditions
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Query filter that can be nested
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition(QueryCondition),
    Group {
        operator: LogicalOperator,
        filters: Vec<QueryFilter>,
    },
}

impl QueryFilter {
    pub fn condition(field: &str, operator: QueryOperator, value: Option<Value>) -> Self {
        Self::Condition(QueryCondition {
            field: field.to_string(),
            operator,
            value,
        })
    }

    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    /// Equal condition; a JSON null becomes IS NULL
    pub fn eq(field: &str, value: Value) -> Self {
        if value.is_null() {
            Self::is_null(field)
        } else {
            Self::condition(field, QueryOperator::Eq, Some(value))
        }
    }

    /// Not equal condition; a JSON null becomes IS NOT NULL
    pub fn ne(field: &str, value: Value) -> Self {
        if value.is_null() {
            Self::is_not_null(field)
        } else {
            Self::condition(field, QueryOperator::Ne, Some(value))
        }
    }

    pub fn gt(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Gt, Some(value))
    }

    pub fn gte(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Gte, Some(value))
    }

    pub fn lt(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Lt, Some(value))
    }

    pub fn lte(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Lte, Some(value))
    }

    pub fn like(field: &str, pattern: &str) -> Self {
        Self::condition(
            field,
            QueryOperator::Like,
            Some(Value::String(pattern.to_string())),
        )
    }

    pub fn ilike(field: &str, pattern: &str) -> Self {
        Self::condition(
            field,
            QueryOperator::ILike,
            Some(Value::String(pattern.to_string())),
        )
    }

    pub fn in_values(field: &str, values: Vec<Value>) -> Self {
        Self::condition(field, QueryOperator::In, Some(Value::Array(values)))
    }

    pub fn not_in_values(field: &str, values: Vec<Value>) -> Self {
        Self::condition(field, QueryOperator::NotIn, Some(Value::Array(values)))
    }

    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, None)
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, None)
    }

    /// Field name when this is a plain condition
    pub fn field(&self) -> Option<&str> {
        match self {
            QueryFilter::Condition(condition) => Some(&condition.field),
            QueryFilter::Group { .. } => None,
        }
    }
}

/// AND-combined list of conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<QueryFilter>,
}

impl Filter {
    /// Empty filter matching every row
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.and(QueryFilter::eq(field, value.into()))
    }

    pub fn ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.and(QueryFilter::ne(field, value.into()))
    }

    pub fn gt(self, field: &str, value: impl Into<Value>) -> Self {
        self.and(QueryFilter::gt(field, value.into()))
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.and(QueryFilter::gte(field, value.into()))
    }

    pub fn lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.and(QueryFilter::lt(field, value.into()))
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.and(QueryFilter::lte(field, value.into()))
    }

    pub fn like(self, field: &str, pattern: &str) -> Self {
        self.and(QueryFilter::like(field, pattern))
    }

    pub fn ilike(self, field: &str, pattern: &str) -> Self {
        self.and(QueryFilter::ilike(field, pattern))
    }

    pub fn in_values(self, field: &str, values: Vec<Value>) -> Self {
        self.and(QueryFilter::in_values(field, values))
    }

    pub fn not_in_values(self, field: &str, values: Vec<Value>) -> Self {
        self.and(QueryFilter::not_in_values(field, values))
    }

    pub fn is_null(self, field: &str) -> Self {
        self.and(QueryFilter::is_null(field))
    }

    pub fn is_not_null(self, field: &str) -> Self {
        self.and(QueryFilter::is_not_null(field))
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Restrict to rows whose `column` is null unless `with_deleted` is set.
    ///
    /// Top-level conditions the caller placed on `column` are replaced, so the
    /// implicit constraint always wins.
    pub fn scoped(&self, column: &str, with_deleted: bool) -> Self {
        if with_deleted {
            return self.clone();
        }
        let mut conditions: Vec<QueryFilter> = self
            .conditions
            .iter()
            .filter(|condition| condition.field() != Some(column))
            .cloned()
            .collect();
        conditions.push(QueryFilter::is_null(column));
        Self { conditions }
    }

    /// Parse a JSON filter object.
    ///
    /// Plain values mean equality (`null` is IS NULL). Operator objects accept
    /// `equals`, `not`, `gt`, `gte`, `lt`, `lte`, `in`, `notIn`, `contains`,
    /// `startsWith` and `endsWith`, with `mode: "insensitive"` switching the
    /// string matchers to ILIKE. `AND`/`OR` take an object or an array of
    /// objects.
    pub fn from_value(value: &Value) -> Result<Self, CrudError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self {
                conditions: parse_object(map)?,
            }),
            _ => Err(filter_error("filter", "expected a JSON object")),
        }
    }
}

impl From<QueryFilter> for Filter {
    fn from(filter: QueryFilter) -> Self {
        Self::new().and(filter)
    }
}

impl From<Vec<QueryFilter>> for Filter {
    fn from(conditions: Vec<QueryFilter>) -> Self {
        Self { conditions }
    }
}

fn filter_error(field: &str, message: &str) -> CrudError {
    CrudError::validation("filter", field, message)
}

fn parse_object(map: &Map<String, Value>) -> Result<Vec<QueryFilter>, CrudError> {
    let mut conditions = Vec::with_capacity(map.len());
    for (key, value) in map {
        match key.as_str() {
            "AND" => conditions.push(QueryFilter::and(parse_group(key, value)?)),
            "OR" => conditions.push(QueryFilter::or(parse_group(key, value)?)),
            _ => conditions.extend(parse_field(key, value)?),
        }
    }
    Ok(conditions)
}

/// Each member of an AND/OR list becomes one AND group of its own conditions
fn parse_group(key: &str, value: &Value) -> Result<Vec<QueryFilter>, CrudError> {
    match value {
        Value::Object(map) => Ok(vec![QueryFilter::and(parse_object(map)?)]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(QueryFilter::and(parse_object(map)?)),
                _ => Err(filter_error(key, "expected an array of objects")),
            })
            .collect(),
        _ => Err(filter_error(key, "expected an object or an array of objects")),
    }
}

fn parse_field(field: &str, value: &Value) -> Result<Vec<QueryFilter>, CrudError> {
    match value {
        Value::Object(ops) => parse_operators(field, ops),
        Value::Array(_) => Err(filter_error(field, "use `in` to match a list of values")),
        other => Ok(vec![QueryFilter::eq(field, other.clone())]),
    }
}

fn parse_operators(field: &str, ops: &Map<String, Value>) -> Result<Vec<QueryFilter>, CrudError> {
    let insensitive = match ops.get("mode") {
        None => false,
        Some(Value::String(mode)) if mode == "insensitive" => true,
        Some(Value::String(mode)) if mode == "default" => false,
        Some(_) => return Err(filter_error(field, "mode must be \"default\" or \"insensitive\"")),
    };

    let mut conditions = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let condition = match op.as_str() {
            "mode" => continue,
            "equals" => QueryFilter::eq(field, operand.clone()),
            "not" => match operand {
                Value::Object(_) | Value::Array(_) => {
                    return Err(filter_error(field, "`not` expects a scalar value"))
                }
                other => QueryFilter::ne(field, other.clone()),
            },
            "gt" => QueryFilter::gt(field, operand.clone()),
            "gte" => QueryFilter::gte(field, operand.clone()),
            "lt" => QueryFilter::lt(field, operand.clone()),
            "lte" => QueryFilter::lte(field, operand.clone()),
            "in" => QueryFilter::in_values(field, list_operand(field, operand)?),
            "notIn" => QueryFilter::not_in_values(field, list_operand(field, operand)?),
            "contains" => pattern(field, operand, insensitive, |s| format!("%{}%", s))?,
            "startsWith" => pattern(field, operand, insensitive, |s| format!("{}%", s))?,
            "endsWith" => pattern(field, operand, insensitive, |s| format!("%{}", s))?,
            other => {
                return Err(filter_error(
                    field,
                    &format!("unsupported filter operator `{}`", other),
                ))
            }
        };
        conditions.push(condition);
    }

    if conditions.is_empty() {
        return Err(filter_error(field, "operator object is empty"));
    }
    Ok(conditions)
}

fn list_operand(field: &str, operand: &Value) -> Result<Vec<Value>, CrudError> {
    match operand {
        Value::Array(values) => Ok(values.clone()),
        _ => Err(filter_error(field, "`in`/`notIn` expect an array")),
    }
}

fn pattern(
    field: &str,
    operand: &Value,
    insensitive: bool,
    wrap: impl Fn(&str) -> String,
) -> Result<QueryFilter, CrudError> {
    let Value::String(text) = operand else {
        return Err(filter_error(field, "string matchers expect a string"));
    };
    let pattern = wrap(&escape_like(text));
    Ok(if insensitive {
        QueryFilter::ilike(field, &pattern)
    } else {
        QueryFilter::like(field, &pattern)
    })
}

/// Escape LIKE wildcards so user text matches literally
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
