/// Sqlpeek Error Module
///
/// This module defines the error types for the sqlpeek application.
/// It provides structured error handling with proper error propagation and
/// user-friendly error messages.
use thiserror::Error;

/// Error type for the sqlpeek application.
///
/// This enum covers the error scenarios that can occur within sqlpeek:
/// - Opening a database file that does not exist
/// - Database operations (connections, metadata queries, table reads)
/// - Configuration loading and validation
/// - File system operations
#[derive(Error, Debug)]
pub enum SqlpeekError {
    /// The given path does not refer to an existing database file.
    ///
    /// Raised before any engine connection is constructed, so a typo'd
    /// path never silently creates an empty database.
    #[error("Invalid database path: {0}")]
    InvalidPath(String),

    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Catalog construction errors (metadata rows that cannot be read)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic application errors for unexpected conditions
    #[error("Application error: {0}")]
    App(String),
}

/// Type alias for Result to use SqlpeekError as the error type.
///
/// This provides a consistent error type across the entire application
/// instead of using `Result<T, String>` or mixed error types.
pub type Result<T> = std::result::Result<T, SqlpeekError>;
