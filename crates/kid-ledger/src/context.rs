//! Per-transaction context supplied by the ordering platform.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use zeroize::Zeroize;

/// Caller identity as asserted (and already verified) by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Raw identity string (subject and issuer of the client certificate)
    pub id: String,
    /// Certificate serial number as big-endian bytes
    pub serial_number: Vec<u8>,
}

impl ClientIdentity {
    pub fn new(id: impl Into<String>, serial_number: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            serial_number: serial_number.into(),
        }
    }
}

/// Transaction context
///
/// The timestamp is the consensus-agreed proposal time, identical on every
/// validating party. Transient values are wiped when the context drops.
pub struct TxContext {
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
    pub creator: ClientIdentity,
    transient: HashMap<String, Vec<u8>>,
}

impl TxContext {
    pub fn new(tx_id: impl Into<String>, timestamp: DateTime<Utc>, creator: ClientIdentity) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp,
            creator,
            transient: HashMap::new(),
        }
    }

    /// Attach a transient (never persisted) input
    pub fn with_transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(key.into(), value.into());
        self
    }

    pub fn transient(&self, key: &str) -> Option<&[u8]> {
        self.transient.get(key).map(Vec::as_slice)
    }
}

impl std::fmt::Debug for TxContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxContext")
            .field("tx_id", &self.tx_id)
            .field("timestamp", &self.timestamp)
            .field("transient_keys", &self.transient.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for TxContext {
    fn drop(&mut self) {
        for value in self.transient.values_mut() {
            value.zeroize();
        }
    }
}
