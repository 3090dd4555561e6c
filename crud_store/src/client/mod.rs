//! Store client implementations
//!
//! `PgClient` talks to PostgreSQL through sqlx; `MemoryClient` keeps tables
//! in process and is what the test suites run against.

mod eval;
pub mod memory;
pub mod postgres;

pub use memory::MemoryClient;
pub use postgres::PgClient;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Current time as the RFC 3339 string stored in timestamp columns
pub fn timestamp_now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}
