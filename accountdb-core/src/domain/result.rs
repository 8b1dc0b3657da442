//! Result and error types for the core library

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::StorageError;

/// Which uniqueness constraint a write collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateField {
    Username,
    Email,
}

impl DuplicateField {
    /// Map a backend column name onto the constrained account field
    pub fn from_column(column: &str) -> Option<Self> {
        match column.trim().to_ascii_lowercase().as_str() {
            "username" => Some(Self::Username),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

impl fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Email => f.write_str("email"),
        }
    }
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate {field}: an account with this {field} already exists")]
    Duplicate { field: DuplicateField },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out after {}ms waiting for the database", .0.as_millis())]
    Timeout(Duration),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Database error: {0}")]
    Infrastructure(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a duplicate error
    pub fn duplicate(field: DuplicateField) -> Self {
        Self::Duplicate { field }
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an infrastructure error
    pub fn infrastructure(msg: impl Into<String>) -> Self {
        Self::Infrastructure(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Only a timeout is worth retrying; everything else needs a change from the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound("no matching row".to_string()),
            StorageError::Timeout(deadline) => Self::Timeout(deadline),
            StorageError::UniqueViolation { column, .. } => {
                match column.as_deref().and_then(DuplicateField::from_column) {
                    Some(field) => Self::Duplicate { field },
                    None => Self::Infrastructure(format!(
                        "unique constraint violated on {}",
                        column.as_deref().unwrap_or("unknown column")
                    )),
                }
            }
            StorageError::Pool(msg) => Self::Infrastructure(format!("connection pool: {}", msg)),
            StorageError::Query(msg) => Self::Infrastructure(msg),
            StorageError::Decode(msg) => Self::Infrastructure(format!("row decode: {}", msg)),
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_field() {
        let err: Error = StorageError::UniqueViolation {
            column: Some("email".to_string()),
            value: Some("a@x.com".to_string()),
        }
        .into();
        assert!(matches!(
            err,
            Error::Duplicate {
                field: DuplicateField::Email
            }
        ));
    }

    #[test]
    fn test_unique_violation_on_unknown_column_is_infrastructure() {
        let err: Error = StorageError::UniqueViolation {
            column: Some("account_id".to_string()),
            value: Some("7".to_string()),
        }
        .into();
        assert!(matches!(err, Error::Infrastructure(_)));

        let err: Error = StorageError::UniqueViolation {
            column: None,
            value: Some("racer".to_string()),
        }
        .into();
        assert!(err.to_string().contains("unknown column"));
    }

    #[test]
    fn test_timeout_is_the_only_retryable_error() {
        let err: Error = StorageError::Timeout(Duration::from_secs(5)).into();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Timed out after 5000ms waiting for the database");

        assert!(!Error::duplicate(DuplicateField::Username).is_retryable());
        assert!(!Error::not_found("alice").is_retryable());
        assert!(!Error::infrastructure("boom").is_retryable());
    }

    #[test]
    fn test_duplicate_message_names_field() {
        let err = Error::duplicate(DuplicateField::Username);
        assert_eq!(
            err.to_string(),
            "Duplicate username: an account with this username already exists"
        );
    }
}
