//! Record identifiers
//!
//! Repositories accept any of the common primary key shapes and turn them into
//! the JSON value the store clients filter on.

use serde_json::Value;
use std::fmt::{self, Display};
use uuid::Uuid;

/// Primary key value of a record: integer, UUID or free-form string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Numeric(i64),
    Uuid(Uuid),
    String(String),
}

impl RecordId {
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Numeric(n) => Value::from(*n),
            RecordId::Uuid(uuid) => Value::String(uuid.to_string()),
            RecordId::String(s) => Value::String(s.clone()),
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Numeric(n) => write!(f, "{}", n),
            RecordId::Uuid(uuid) => write!(f, "{}", uuid),
            RecordId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId::Numeric(id as i64)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Numeric(id)
    }
}

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        RecordId::Numeric(id as i64)
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        RecordId::Uuid(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::String(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::String(id.to_string())
    }
}

impl From<&RecordId> for RecordId {
    fn from(id: &RecordId) -> Self {
        id.clone()
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        id.to_value()
    }
}
