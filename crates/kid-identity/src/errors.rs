//! Identity error types.

use thiserror::Error;

/// Whether an error's message may reach the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caused by the caller or the records it targets; safe to describe
    Domain,
    /// Ledger, encoding or crypto failure; logged, never described
    Infrastructure,
}

impl ErrorKind {
    pub fn exposes_detail(self) -> bool {
        matches!(self, ErrorKind::Domain)
    }
}

/// Identity registry errors
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No KID or certificate for the caller or target
    #[error("not registered certificate")]
    NotRegistered,

    /// Certificate has a revocation time
    #[error("revoked certificate")]
    Revoked,

    /// Revocation requested for an already revoked certificate
    #[error("already revoked certificate")]
    AlreadyRevoked,

    /// Supplied PIN does not match, or a PIN was supplied where none exists
    #[error("mismatched PIN")]
    MismatchedPin,

    /// KID is locked to another certificate
    #[error("not locked certificate")]
    NotLocked,

    /// A KID document already exists at the caller's primary key
    #[error("already registered KID")]
    AlreadyRegistered,

    /// Newly generated public id collides with an existing KID
    #[error("duplicated KID, retry with a new transaction")]
    DuplicateKid,

    /// Wrong parameter count or shape
    #[error("incorrect number of parameters. expecting {0}")]
    InvalidParams(String),

    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] kid_ledger::LedgerError),

    /// Document encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cryptographic error
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] kid_crypto::CryptoError),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Ledger(_)
            | IdentityError::Serialization(_)
            | IdentityError::Crypto(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Domain,
        }
    }
}

/// Result type for identity operations
pub type Result<T> = std::result::Result<T, IdentityError>;
