//! Core error types for the XM company registry.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::constants::{ERROR_CODE_INVALID_FIELDS, ERROR_CODE_INVALID_REQUEST_PAYLOAD};

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the registry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns true when the error is a lookup miss rather than a store failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Database(DatabaseError::NotFound(_)))
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed to begin, commit or was already completed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A write was attempted through a read-only unit of work.
    #[error("Read-only unit of work: {0}")]
    ReadOnly(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input.
///
/// Field errors map a field name to an error code such as `Key_Required`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid fields: {0:?}")]
    InvalidFields(BTreeMap<String, String>),

    #[error("Invalid request payload: {0}")]
    InvalidRequestPayload(String),
}

impl ValidationError {
    /// Builds an `InvalidFields` error for a single field.
    pub fn invalid_field(field: &str, code: &str) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), code.to_string());
        ValidationError::InvalidFields(errors)
    }

    /// The top-level error key reported to API clients.
    pub fn error_key(&self) -> &'static str {
        match self {
            ValidationError::InvalidFields(_) => ERROR_CODE_INVALID_FIELDS,
            ValidationError::InvalidRequestPayload(_) => ERROR_CODE_INVALID_REQUEST_PAYLOAD,
        }
    }

    /// Per-field error codes. Payload errors are reported under `payload`.
    pub fn errors(&self) -> BTreeMap<String, String> {
        match self {
            ValidationError::InvalidFields(errors) => errors.clone(),
            ValidationError::InvalidRequestPayload(code) => {
                let mut errors = BTreeMap::new();
                errors.insert("payload".to_string(), code.clone());
                errors
            }
        }
    }
}
