//! Ledger error types.

use thiserror::Error;

/// Ledger operation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid namespace
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Empty or otherwise unusable key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Malformed rich query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Bookmark that does not decode to a key
    #[error("Invalid bookmark: {0}")]
    InvalidBookmark(String),

    /// A key read by the transaction changed before commit
    #[error("MVCC read conflict on {namespace}/{key}")]
    Conflict { namespace: String, key: String },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
