//! Transaction engine shared by every backend.

use crate::context::{ClientIdentity, TxContext};
use crate::errors::{LedgerError, Result};
use crate::namespaces::{private_namespace, NS_STATE};
use crate::selector::Query;
use crate::traits::{check_key, Backend, LedgerStub, QueryRecord, QueryResponseMetadata, WriteOp};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

type NsKey = (String, String);

/// A single invocation's transaction
///
/// Point reads are recorded with the version observed so that `commit` can
/// reject the transaction if another one changed them in the meantime.
/// Writes are buffered and invisible to reads of the same transaction.
/// Query results are not part of the read set.
pub struct Transaction<'a, B: Backend> {
    backend: &'a B,
    ctx: TxContext,
    reads: BTreeMap<NsKey, Option<u64>>,
    writes: BTreeMap<NsKey, WriteOp>,
}

impl<'a, B: Backend> Transaction<'a, B> {
    pub fn new(backend: &'a B, ctx: TxContext) -> Self {
        Self {
            backend,
            ctx,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Commit the transaction atomically
    pub fn commit(self) -> Result<()> {
        let reads: Vec<_> = self.reads.into_iter().collect();
        let writes: Vec<_> = self.writes.into_iter().collect();

        self.backend.commit(&reads, &writes)?;

        debug!(
            tx_id = %self.ctx.tx_id,
            reads = reads.len(),
            writes = writes.len(),
            "Transaction committed"
        );
        Ok(())
    }

    /// Drop the transaction without committing
    pub fn rollback(self) {
        debug!(tx_id = %self.ctx.tx_id, "Transaction rolled back");
    }

    fn read(&mut self, namespace: String, key: &str) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        let current = self.backend.get(&namespace, key)?;

        let observed = current.as_ref().map(|v| v.version);
        // Keep the first observation; a later read of a changed key must
        // still fail validation.
        self.reads
            .entry((namespace, key.to_string()))
            .or_insert(observed);

        Ok(current.map(|v| v.value))
    }

    fn write(&mut self, namespace: String, key: &str, op: WriteOp) -> Result<()> {
        check_key(key)?;
        self.writes.insert((namespace, key.to_string()), op);
        Ok(())
    }

    fn scan_matching(
        &self,
        query: &Query,
        start_after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<QueryRecord>> {
        let mut records = Vec::new();

        self.backend
            .scan(NS_STATE, start_after, &mut |key, versioned| {
                if limit.is_some_and(|l| records.len() >= l) {
                    return false;
                }
                if query.selector.matches(&versioned.value) {
                    records.push(QueryRecord {
                        key: key.to_string(),
                        value: versioned.value.clone(),
                    });
                }
                true
            })?;

        Ok(records)
    }
}

impl<'a, B: Backend> LedgerStub for Transaction<'a, B> {
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.read(NS_STATE.to_string(), key)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.write(NS_STATE.to_string(), key, Some(value))
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        self.write(NS_STATE.to_string(), key, None)
    }

    fn get_private_data(&mut self, collection: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.read(private_namespace(collection), key)
    }

    fn put_private_data(&mut self, collection: &str, key: &str, value: Vec<u8>) -> Result<()> {
        self.write(private_namespace(collection), key, Some(value))
    }

    fn del_private_data(&mut self, collection: &str, key: &str) -> Result<()> {
        self.write(private_namespace(collection), key, None)
    }

    fn get_query_result(&mut self, query: &str) -> Result<Vec<QueryRecord>> {
        let parsed = Query::parse(query)?;
        self.scan_matching(&parsed, None, parsed.limit)
    }

    fn get_query_result_with_pagination(
        &mut self,
        query: &str,
        page_size: usize,
        bookmark: &str,
    ) -> Result<(Vec<QueryRecord>, QueryResponseMetadata)> {
        if page_size == 0 {
            return Err(LedgerError::InvalidQuery(
                "page size must be positive".to_string(),
            ));
        }
        let parsed = Query::parse(query)?;
        let start_after = decode_bookmark(bookmark)?;

        let records = self.scan_matching(&parsed, start_after.as_deref(), Some(page_size))?;

        // An exhausted listing hands the caller's bookmark back unchanged
        let next = match records.last() {
            Some(last) => encode_bookmark(&last.key),
            None => bookmark.to_string(),
        };

        let metadata = QueryResponseMetadata {
            fetched_records_count: records.len(),
            bookmark: next,
        };
        Ok((records, metadata))
    }

    fn tx_id(&self) -> &str {
        &self.ctx.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.ctx.timestamp
    }

    fn transient(&self, key: &str) -> Option<&[u8]> {
        self.ctx.transient(key)
    }

    fn creator(&self) -> &ClientIdentity {
        &self.ctx.creator
    }
}

fn encode_bookmark(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key.as_bytes())
}

fn decode_bookmark(bookmark: &str) -> Result<Option<String>> {
    if bookmark.is_empty() {
        return Ok(None);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(bookmark)
        .map_err(|e| LedgerError::InvalidBookmark(e.to_string()))?;
    let key = String::from_utf8(bytes).map_err(|e| LedgerError::InvalidBookmark(e.to_string()))?;
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmark_round_trip() {
        let bookmark = encode_bookmark("CERT_abc_01");
        assert_eq!(decode_bookmark(&bookmark).unwrap().as_deref(), Some("CERT_abc_01"));
        assert_eq!(decode_bookmark("").unwrap(), None);
    }

    #[test]
    fn test_invalid_bookmark() {
        assert!(matches!(
            decode_bookmark("***"),
            Err(LedgerError::InvalidBookmark(_))
        ));
    }
}
