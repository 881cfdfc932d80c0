//! RocksDB ledger backend.

use crate::{
    errors::{LedgerError, Result},
    namespaces::all_namespaces,
    traits::{Backend, Versioned, WriteOp},
};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use tracing::debug;

/// Column family holding ledger bookkeeping
const CF_META: &str = "meta";

/// Key of the committed height inside `CF_META`
const HEIGHT_KEY: &[u8] = b"height";

/// RocksDB ledger
///
/// One column family per namespace. Values are stored bincode-encoded as
/// [`Versioned`]. Commits are serialized through a mutex so that read-set
/// validation and the write batch see the same snapshot.
pub struct RocksDbLedger {
    db: DB,
    commit_lock: Mutex<()>,
    _temp_dir: Option<TempDir>,
}

impl RocksDbLedger {
    /// Open the ledger at the specified path
    ///
    /// Creates the world state column family and one per private collection
    /// if they don't exist. Column families already present on disk are
    /// opened as well, so a collection can be dropped from `collections`
    /// without losing access to the database.
    pub fn open<P: AsRef<Path>>(path: P, collections: &[&str]) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Listing fails when the database does not exist yet
        let mut column_families = DB::list_cf(&opts, &path).unwrap_or_default();
        for cf in all_namespaces(collections)
            .into_iter()
            .chain(std::iter::once(CF_META.to_string()))
        {
            if !column_families.contains(&cf) {
                column_families.push(cf);
            }
        }

        let db = DB::open_cf(&opts, &path, column_families)
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        debug!("Opened RocksDB ledger at {:?}", path.as_ref());

        Ok(Self {
            db,
            commit_lock: Mutex::new(()),
            _temp_dir: None,
        })
    }

    /// Open a ledger in a temporary directory
    ///
    /// The directory lives as long as the ledger.
    pub fn open_test(collections: &[&str]) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut ledger = Self::open(temp_dir.path(), collections)?;
        ledger._temp_dir = Some(temp_dir);
        Ok(ledger)
    }

    /// Get column family handle
    fn cf_handle(&self, cf: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(cf)
            .ok_or_else(|| LedgerError::InvalidNamespace(cf.to_string()))
    }

    fn height(&self) -> Result<u64> {
        let cf = self.cf_handle(CF_META)?;
        match self
            .db
            .get_cf(cf, HEIGHT_KEY)
            .map_err(|e| LedgerError::Database(e.to_string()))?
        {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| LedgerError::Deserialization(e.to_string())),
            None => Ok(0),
        }
    }
}

fn decode(bytes: &[u8]) -> Result<Versioned> {
    bincode::deserialize(bytes).map_err(|e| LedgerError::Deserialization(e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}

impl Backend for RocksDbLedger {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Versioned>> {
        let cf = self.cf_handle(namespace)?;

        let result = self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        result.map(|bytes| decode(&bytes)).transpose()
    }

    fn scan(
        &self,
        namespace: &str,
        start_after: Option<&str>,
        visitor: &mut dyn FnMut(&str, &Versioned) -> bool,
    ) -> Result<()> {
        let cf = self.cf_handle(namespace)?;

        let mode = match start_after {
            Some(key) => IteratorMode::From(key.as_bytes(), Direction::Forward),
            None => IteratorMode::Start,
        };

        for item in self.db.iterator_cf(cf, mode) {
            let (key, value) = item.map_err(|e| LedgerError::Database(e.to_string()))?;
            let key = std::str::from_utf8(&key)
                .map_err(|e| LedgerError::Deserialization(e.to_string()))?;

            // `From` is inclusive
            if Some(key) == start_after {
                continue;
            }

            if !visitor(key, &decode(&value)?) {
                break;
            }
        }

        Ok(())
    }

    fn commit(
        &self,
        reads: &[((String, String), Option<u64>)],
        writes: &[((String, String), WriteOp)],
    ) -> Result<()> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| LedgerError::Database("commit lock poisoned".to_string()))?;

        for ((namespace, key), observed) in reads {
            let current = self.get(namespace, key)?.map(|v| v.version);
            if current != *observed {
                return Err(LedgerError::Conflict {
                    namespace: namespace.clone(),
                    key: key.clone(),
                });
            }
        }

        if writes.is_empty() {
            return Ok(());
        }

        let version = self.height()? + 1;
        let mut batch = WriteBatch::default();

        for ((namespace, key), op) in writes {
            let cf = self.cf_handle(namespace)?;
            match op {
                Some(value) => {
                    let versioned = Versioned {
                        version,
                        value: value.clone(),
                    };
                    batch.put_cf(cf, key.as_bytes(), encode(&versioned)?);
                }
                None => batch.delete_cf(cf, key.as_bytes()),
            }
        }
        batch.put_cf(self.cf_handle(CF_META)?, HEIGHT_KEY, encode(&version)?);

        self.db
            .write(batch)
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        debug!(height = version, "Batch committed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ClientIdentity, TxContext};
    use crate::namespaces::NS_STATE;
    use crate::traits::{BackendExt, LedgerStub};
    use chrono::Utc;

    fn ctx(tx_id: &str) -> TxContext {
        TxContext::new(tx_id, Utc::now(), ClientIdentity::new("client", vec![0x01]))
    }

    #[test]
    fn test_put_and_get() {
        let ledger = RocksDbLedger::open_test(&[]).unwrap();

        let mut tx = ledger.begin(ctx("tx1"));
        tx.put_state("k1", b"v1".to_vec()).unwrap();
        tx.commit().unwrap();

        let mut tx = ledger.begin(ctx("tx2"));
        assert_eq!(tx.get_state("k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(tx.get_state("k2").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let ledger = RocksDbLedger::open_test(&[]).unwrap();
        ledger.seed(NS_STATE, "k1", b"v1".to_vec()).unwrap();

        let mut tx = ledger.begin(ctx("tx1"));
        tx.del_state("k1").unwrap();
        tx.commit().unwrap();

        assert_eq!(ledger.read_committed(NS_STATE, "k1").unwrap(), None);
    }

    #[test]
    fn test_rollback() {
        let ledger = RocksDbLedger::open_test(&[]).unwrap();

        let mut tx = ledger.begin(ctx("tx1"));
        tx.put_state("k1", b"v1".to_vec()).unwrap();
        tx.rollback();

        assert_eq!(ledger.read_committed(NS_STATE, "k1").unwrap(), None);
    }

    #[test]
    fn test_conflict_detection() {
        let ledger = RocksDbLedger::open_test(&[]).unwrap();
        ledger.seed(NS_STATE, "k1", b"v0".to_vec()).unwrap();

        let mut stale = ledger.begin(ctx("tx1"));
        assert!(stale.get_state("k1").unwrap().is_some());

        let mut fresh = ledger.begin(ctx("tx2"));
        fresh.get_state("k1").unwrap();
        fresh.put_state("k1", b"v1".to_vec()).unwrap();
        fresh.commit().unwrap();

        stale.put_state("k1", b"v2".to_vec()).unwrap();
        assert!(matches!(stale.commit(), Err(LedgerError::Conflict { .. })));
    }

    #[test]
    fn test_private_collection() {
        let ledger = RocksDbLedger::open_test(&["legacy"]).unwrap();

        let mut tx = ledger.begin(ctx("tx1"));
        tx.put_private_data("legacy", "k1", b"v1".to_vec()).unwrap();
        tx.commit().unwrap();

        let mut tx = ledger.begin(ctx("tx2"));
        assert_eq!(
            tx.get_private_data("legacy", "k1").unwrap(),
            Some(b"v1".to_vec())
        );
        assert!(matches!(
            tx.get_private_data("unknown", "k1"),
            Err(LedgerError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn test_reopen_without_private_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");

        {
            let ledger = RocksDbLedger::open(&path, &["legacy"]).unwrap();
            let mut tx = ledger.begin(ctx("tx1"));
            tx.put_state("k1", b"v1".to_vec()).unwrap();
            tx.put_private_data("legacy", "k1", b"v1".to_vec()).unwrap();
            tx.commit().unwrap();
        }

        let ledger = RocksDbLedger::open(&path, &[]).unwrap();
        assert_eq!(
            ledger.read_committed(NS_STATE, "k1").unwrap(),
            Some(b"v1".to_vec())
        );
        drop(ledger);

        let ledger = RocksDbLedger::open(&path, &["legacy"]).unwrap();
        let mut tx = ledger.begin(ctx("tx2"));
        assert_eq!(
            tx.get_private_data("legacy", "k1").unwrap(),
            Some(b"v1".to_vec())
        );
    }

    #[test]
    fn test_paginated_query_skips_bookmark_key() {
        let ledger = RocksDbLedger::open_test(&[]).unwrap();
        for i in 0..3 {
            ledger
                .seed(NS_STATE, &format!("DOC_{}", i), br#"{"t":"doc"}"#.to_vec())
                .unwrap();
        }

        let query = r#"{"selector":{"t":"doc"}}"#;
        let mut tx = ledger.begin(ctx("tx1"));

        let (first, meta) = tx.get_query_result_with_pagination(query, 2, "").unwrap();
        let (second, _) = tx
            .get_query_result_with_pagination(query, 2, &meta.bookmark)
            .unwrap();

        let keys: Vec<_> = first.iter().chain(second.iter()).map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec!["DOC_0", "DOC_1", "DOC_2"]);
    }
}
