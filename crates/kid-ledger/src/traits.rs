//! Ledger trait definitions.

use crate::context::{ClientIdentity, TxContext};
use crate::errors::{LedgerError, Result};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One transaction's view of the ledger
///
/// This is the only surface the identity registry sees. Writes are buffered
/// until the platform commits the transaction, so reads never observe
/// writes made earlier in the same transaction.
pub trait LedgerStub {
    /// Get a value from the world state
    ///
    /// # Returns
    ///
    /// `Ok(Some(bytes))` if the key exists, `Ok(None)` if not found
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value into the world state
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a key from the world state
    fn del_state(&mut self, key: &str) -> Result<()>;

    /// Get a value from a private data collection
    fn get_private_data(&mut self, collection: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value into a private data collection
    fn put_private_data(&mut self, collection: &str, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a key from a private data collection
    fn del_private_data(&mut self, collection: &str, key: &str) -> Result<()>;

    /// Run a rich (selector) query over the world state
    fn get_query_result(&mut self, query: &str) -> Result<Vec<QueryRecord>>;

    /// Run a rich query returning at most `page_size` records after `bookmark`
    ///
    /// An empty bookmark starts from the beginning.
    fn get_query_result_with_pagination(
        &mut self,
        query: &str,
        page_size: usize,
        bookmark: &str,
    ) -> Result<(Vec<QueryRecord>, QueryResponseMetadata)>;

    /// Transaction id, unique per invocation
    fn tx_id(&self) -> &str;

    /// Deterministic, consensus-agreed transaction timestamp
    fn tx_timestamp(&self) -> DateTime<Utc>;

    /// Transient input by key
    fn transient(&self, key: &str) -> Option<&[u8]>;

    /// Platform-verified identity of the caller
    fn creator(&self) -> &ClientIdentity;
}

/// Key/value pair returned by a rich query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub key: String,
    pub value: Vec<u8>,
}

/// Pagination metadata returned with a page of query results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponseMetadata {
    pub fetched_records_count: usize,
    pub bookmark: String,
}

/// Committed value with the ledger height at which it was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    pub version: u64,
    pub value: Vec<u8>,
}

/// Pending write: `Some(bytes)` to put, `None` to delete
pub type WriteOp = Option<Vec<u8>>;

/// Storage engine underneath a [`Transaction`]
///
/// Backends only know about committed data. Read-set validation and the
/// atomic application of the write set both happen inside `commit`.
pub trait Backend: Send + Sync {
    /// Get a committed value
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Versioned>>;

    /// Visit committed entries of a namespace in key order
    ///
    /// Starts after `start_after` when given. The visitor returns `false`
    /// to stop the scan.
    fn scan(
        &self,
        namespace: &str,
        start_after: Option<&str>,
        visitor: &mut dyn FnMut(&str, &Versioned) -> bool,
    ) -> Result<()>;

    /// Validate `reads` against the current versions and apply `writes`
    ///
    /// Either every write is applied or none is. Fails with
    /// [`LedgerError::Conflict`] when any read version is stale.
    fn commit(
        &self,
        reads: &[((String, String), Option<u64>)],
        writes: &[((String, String), WriteOp)],
    ) -> Result<()>;
}

/// Extension trait providing transaction helpers for every backend
pub trait BackendExt: Backend + Sized {
    /// Begin a transaction against this backend
    fn begin(&self, ctx: TxContext) -> Transaction<'_, Self> {
        Transaction::new(self, ctx)
    }

    /// Read a committed value outside any transaction
    fn read_committed(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get(namespace, key)?.map(|v| v.value))
    }

    /// Write a value directly, bypassing read-set validation
    ///
    /// Used to seed fixtures and imports.
    fn seed(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
        self.commit(&[], &[((namespace.to_string(), key.to_string()), Some(value))])
    }
}

impl<T: Backend> BackendExt for T {}

/// Reject empty keys before they reach a backend
pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(LedgerError::InvalidKey("empty key".to_string()));
    }
    Ok(())
}
