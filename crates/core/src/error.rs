//! Error types for La Mesa Core

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum Error {
    /// The ledger file could not be opened
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] rusqlite::Error),

    /// A write failed mid-transaction and was rolled back
    #[error("Transaction failed during {operation}: {source}")]
    TransactionFailure {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A stored timestamp could not be parsed
    #[error("Malformed timestamp in record {id}: {value:?}")]
    MalformedTimestamp { id: i64, value: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a failure that happened inside a write transaction
    pub fn transaction(operation: &'static str, source: rusqlite::Error) -> Self {
        Error::TransactionFailure { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
