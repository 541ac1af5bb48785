//! Store error types.

use dollarbars_types::DollarbarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The database rejected a statement.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A value cannot be encoded in its column.
    #[error("Invalid {column} in '{table}': {value}")]
    InvalidValue {
        /// Table name.
        table: String,
        /// Column name.
        column: &'static str,
        /// Offending value.
        value: String,
    },

    /// Append to a table that was never created.
    #[error("Table does not exist: {0}")]
    MissingTable(String),

    /// Append would violate the table's unique key.
    #[error("Duplicate key in '{table}': {key}")]
    DuplicateKey {
        /// Table name.
        table: String,
        /// Offending `(timestamp, id)` key.
        key: String,
    },

    /// A previous writer panicked while holding the table lock.
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for DollarbarsError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
