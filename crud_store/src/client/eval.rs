//! Filter evaluation and ordering over JSON rows
//!
//! Mirrors the PostgreSQL semantics the generated SQL relies on: comparisons
//! against NULL never match, ascending order puts NULLs last and descending
//! order puts them first.

use crate::query_builder::{Filter, LogicalOperator, QueryCondition, QueryFilter, QueryOperator, SortField, SortOrder};
use crate::Row;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::cmp::Ordering;

pub(crate) fn matches(row: &Row, filter: &Filter) -> bool {
    filter.conditions().iter().all(|condition| matches_filter(row, condition))
}

fn matches_filter(row: &Row, filter: &QueryFilter) -> bool {
    match filter {
        QueryFilter::Condition(condition) => matches_condition(row, condition),
        QueryFilter::Group { operator, filters } => match operator {
            LogicalOperator::And => filters.iter().all(|f| matches_filter(row, f)),
            LogicalOperator::Or => filters.iter().any(|f| matches_filter(row, f)),
        },
    }
}

fn matches_condition(row: &Row, condition: &QueryCondition) -> bool {
    let actual = row.get(&condition.field).unwrap_or(&Value::Null);
    let expected = condition.value.as_ref().unwrap_or(&Value::Null);

    match condition.operator {
        QueryOperator::IsNull => actual.is_null(),
        QueryOperator::IsNotNull => !actual.is_null(),
        QueryOperator::Eq if expected.is_null() => actual.is_null(),
        QueryOperator::Ne if expected.is_null() => !actual.is_null(),
        _ if actual.is_null() || expected.is_null() => false,
        QueryOperator::Eq => values_equal(actual, expected),
        QueryOperator::Ne => !values_equal(actual, expected),
        QueryOperator::Gt => compare(actual, expected) == Some(Ordering::Greater),
        QueryOperator::Gte => matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
        QueryOperator::Lt => compare(actual, expected) == Some(Ordering::Less),
        QueryOperator::Lte => matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        QueryOperator::Like | QueryOperator::ILike => match (actual, expected) {
            (Value::String(text), Value::String(pattern)) => {
                like(text, pattern, condition.operator == QueryOperator::ILike)
            }
            _ => false,
        },
        QueryOperator::In => match expected {
            Value::Array(values) => values.iter().any(|v| values_equal(actual, v)),
            _ => false,
        },
        QueryOperator::NotIn => match expected {
            Value::Array(values) => !values.iter().any(|v| values_equal(actual, v)),
            _ => true,
        },
    }
}

pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match compare(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// Order two non-null scalars of the same kind; timestamps compare as instants
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Multi-key ordering with PostgreSQL NULL placement
pub(crate) fn compare_rows(a: &Row, b: &Row, order_by: &[SortField]) -> Ordering {
    for sort in order_by {
        let left = a.get(&sort.field).unwrap_or(&Value::Null);
        let right = b.get(&sort.field).unwrap_or(&Value::Null);
        // NULL sorts as the largest value
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
        };
        let ordering = match sort.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[derive(Debug, PartialEq)]
enum Token {
    AnySequence,
    AnyChar,
    Literal(char),
}

fn tokenize(pattern: &str, case_insensitive: bool) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '%' => Token::AnySequence,
            '_' => Token::AnyChar,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        };
        tokens.push(match token {
            Token::Literal(c) if case_insensitive => Token::Literal(c.to_ascii_lowercase()),
            token => token,
        });
    }
    tokens
}

/// SQL LIKE matching with `%`, `_` and backslash escapes
pub(crate) fn like(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let tokens = tokenize(pattern, case_insensitive);
    let text: Vec<char> = if case_insensitive {
        text.chars().map(|c| c.to_ascii_lowercase()).collect()
    } else {
        text.chars().collect()
    };

    // matched[j]: the tokens seen so far match text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::AnySequence => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= matched[j];
                    next[j] = reachable;
                }
            }
            Token::AnyChar => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            Token::Literal(c) => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}
