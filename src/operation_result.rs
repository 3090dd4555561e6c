//! Structured operation outcomes
//!
//! Service code returns an `OperationResult` instead of raising: a success
//! flag, the payload or a message key, and the HTTP status a transport layer
//! should answer with.

use crud_store::query_builder::pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use crud_store::{CrudError, PaginationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HTTP_OK: u16 = 200;
pub const HTTP_BAD_REQUEST: u16 = 400;
pub const HTTP_UNAUTHORIZED: u16 = 401;
pub const HTTP_NOT_FOUND: u16 = 404;
pub const HTTP_CONFLICT: u16 = 409;
pub const HTTP_UNPROCESSABLE_ENTITY: u16 = 422;
pub const HTTP_INTERNAL_SERVER_ERROR: u16 = 500;

/// Message key used when an internal error carries no message of its own
pub const SERVER_ERROR_MESSAGE: &str = "common.server_error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Application-specific code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
            http_code: None,
            metadata: None,
        }
    }

    fn failure(message: impl Into<String>, http_code: u16) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            code: None,
            http_code: Some(http_code),
            metadata: None,
        }
    }

    /// 500 with the given message, or `common.server_error`
    pub fn internal_server_error(message: Option<&str>) -> Self {
        Self::failure(
            message.unwrap_or(SERVER_ERROR_MESSAGE),
            HTTP_INTERNAL_SERVER_ERROR,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(message, HTTP_NOT_FOUND)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failure(message, HTTP_BAD_REQUEST)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::failure(message, HTTP_CONFLICT)
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::failure(message, HTTP_UNPROCESSABLE_ENTITY)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::failure(message, HTTP_UNAUTHORIZED)
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Status a transport should answer with; successes default to 200
    pub fn status(&self) -> u16 {
        self.http_code.unwrap_or(if self.success {
            HTTP_OK
        } else {
            HTTP_INTERNAL_SERVER_ERROR
        })
    }

    /// Map a repository error onto the matching failure.
    ///
    /// Database, serialization and transaction errors are logged and reported
    /// as `common.server_error` so driver details never reach the caller.
    pub fn from_error(error: &CrudError) -> Self {
        match error {
            CrudError::Validation { .. } | CrudError::InvalidIdentifier(_) => {
                Self::bad_request(error.to_string())
            }
            CrudError::NotFound { .. } => Self::not_found(error.to_string()),
            CrudError::UniqueViolation { .. } => Self::conflict(error.to_string()),
            _ => {
                tracing::error!(error = %error, "Operation failed");
                Self::internal_server_error(None)
            }
        }
    }
}

impl<U> OperationResult<PaginationResult<U>> {
    /// Successful result holding an empty first page
    pub fn empty_pagination() -> Self {
        Self::ok(PaginationResult::empty(DEFAULT_PAGE, DEFAULT_PAGE_SIZE))
    }
}

impl<T> From<Result<T, CrudError>> for OperationResult<T> {
    fn from(result: Result<T, CrudError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::from_error(&error),
        }
    }
}
