//! Error types for dollarbars.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias for dollarbars operations.
pub type Result<T> = std::result::Result<T, DollarbarsError>;

/// Errors that can occur while ingesting trades or generating bars.
#[derive(Error, Debug)]
pub enum DollarbarsError {
    /// Recoverable network failure. The same request may be retried.
    #[error("Network error: {0}")]
    Network(String),

    /// The exchange rejected the request or answered with something unusable.
    #[error("Exchange protocol error: {0}")]
    Protocol(String),

    /// A raw field could not be converted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The persistence layer failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Exchange identifier not present in the registry.
    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),

    /// Dollar bar interval must be strictly positive.
    #[error("Invalid bar interval: {0}")]
    InvalidInterval(Decimal),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Decimal conversion error.
    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),
}

impl DollarbarsError {
    /// Returns true for errors that leave state untouched and may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true for errors reported by the upstream exchange.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
