use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrudError {
    #[error("Validation error in {model}.{field}: {message}")]
    Validation {
        model: String,
        field: String,
        message: String,
    },

    #[error("{model} not found during {operation}")]
    NotFound { model: String, operation: String },

    #[error("Database error in {model} during {operation}: {source}")]
    Database {
        model: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unique constraint violated on {model}: {detail}")]
    UniqueViolation { model: String, detail: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),
}

impl CrudError {
    pub fn validation(model: &str, field: &str, message: &str) -> Self {
        Self::Validation {
            model: model.to_string(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found(model: &str, operation: &str) -> Self {
        Self::NotFound {
            model: model.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn database_operation(model: &str, operation: &str, source: sqlx::Error) -> Self {
        Self::Database {
            model: model.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    pub fn unique_violation(model: &str, detail: impl Into<String>) -> Self {
        Self::UniqueViolation {
            model: model.to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidIdentifier(_))
    }
}
