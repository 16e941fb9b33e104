use rusqlite::Error as RusqliteError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] RusqliteError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}

/// A query parameter that could not be interpreted. The normalizer never hands
/// these to callers; it logs them and substitutes the field's default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for '{field}': {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::new("page", "not a number: 'abc'");
        assert_eq!(err.to_string(), "invalid value for 'page': not a number: 'abc'");
    }

    #[test]
    fn test_rusqlite_error_converts() {
        let err: StorefrontError = RusqliteError::QueryReturnedNoRows.into();
        assert!(matches!(err, StorefrontError::DatabaseError(_)));
    }
}
