//! Custom error types for the common library
//!
//! This module defines the error types shared by both services: database
//! failures and API key lifecycle failures.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[from] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised by the API key lifecycle
#[derive(Error, Debug)]
pub enum ApiKeyError {
    /// No key matches the presented credential
    #[error("Invalid API key")]
    Invalid,

    /// The key exists but was deactivated
    #[error("API key has been disabled")]
    Disabled,

    /// The key exists but its expiry date has passed
    #[error("API key has expired")]
    Expired,

    /// No key with the requested id
    #[error("API key not found")]
    NotFound,

    /// The backing store failed
    #[error("API key storage error: {0}")]
    Storage(#[from] DatabaseError),
}
