//! In-memory ledger backend.

use crate::errors::{LedgerError, Result};
use crate::traits::{Backend, Versioned, WriteOp};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    height: u64,
    namespaces: HashMap<String, BTreeMap<String, Versioned>>,
}

/// In-memory ledger
///
/// Keeps every namespace in an ordered map. Each commit advances the ledger
/// height by one and stamps the written values with it.
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed transactions
    pub fn height(&self) -> Result<u64> {
        Ok(self.read_state()?.height)
    }

    /// Number of committed keys in a namespace
    pub fn len(&self, namespace: &str) -> Result<usize> {
        Ok(self
            .read_state()?
            .namespaces
            .get(namespace)
            .map_or(0, BTreeMap::len))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Database("memory ledger lock poisoned".to_string()))
    }
}

impl Backend for MemoryLedger {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Versioned>> {
        let state = self.read_state()?;
        Ok(state
            .namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn scan(
        &self,
        namespace: &str,
        start_after: Option<&str>,
        visitor: &mut dyn FnMut(&str, &Versioned) -> bool,
    ) -> Result<()> {
        let state = self.read_state()?;
        let Some(entries) = state.namespaces.get(namespace) else {
            return Ok(());
        };

        let lower = match start_after {
            Some(key) => Bound::Excluded(key.to_string()),
            None => Bound::Unbounded,
        };

        for (key, value) in entries.range((lower, Bound::Unbounded)) {
            if !visitor(key, value) {
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
        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::Database("memory ledger lock poisoned".to_string()))?;

        for ((namespace, key), observed) in reads {
            let current = state
                .namespaces
                .get(namespace)
                .and_then(|entries| entries.get(key))
                .map(|v| v.version);
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

        state.height += 1;
        let version = state.height;

        for ((namespace, key), op) in writes {
            let entries = state.namespaces.entry(namespace.clone()).or_default();
            match op {
                Some(value) => {
                    entries.insert(
                        key.clone(),
                        Versioned {
                            version,
                            value: value.clone(),
                        },
                    );
                }
                None => {
                    entries.remove(key);
                }
            }
        }

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
        let ledger = MemoryLedger::new();

        let mut tx = ledger.begin(ctx("tx1"));
        tx.put_state("k1", b"v1".to_vec()).unwrap();
        tx.commit().unwrap();

        let mut tx = ledger.begin(ctx("tx2"));
        assert_eq!(tx.get_state("k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(tx.get_state("missing").unwrap(), None);
    }

    #[test]
    fn test_writes_invisible_until_commit() {
        let ledger = MemoryLedger::new();

        let mut tx = ledger.begin(ctx("tx1"));
        tx.put_state("k1", b"v1".to_vec()).unwrap();
        assert_eq!(tx.get_state("k1").unwrap(), None);
        assert_eq!(tx.pending_writes(), 1);
        tx.rollback();

        assert_eq!(ledger.read_committed(NS_STATE, "k1").unwrap(), None);
        assert_eq!(ledger.height().unwrap(), 0);
    }

    #[test]
    fn test_conflicting_transactions() {
        let ledger = MemoryLedger::new();

        let mut first = ledger.begin(ctx("tx1"));
        let mut second = ledger.begin(ctx("tx2"));

        assert_eq!(first.get_state("k1").unwrap(), None);
        assert_eq!(second.get_state("k1").unwrap(), None);

        first.put_state("k1", b"first".to_vec()).unwrap();
        second.put_state("k1", b"second".to_vec()).unwrap();

        first.commit().unwrap();
        assert!(matches!(
            second.commit(),
            Err(LedgerError::Conflict { .. })
        ));

        assert_eq!(
            ledger.read_committed(NS_STATE, "k1").unwrap(),
            Some(b"first".to_vec())
        );
    }

    #[test]
    fn test_private_data_is_separate() {
        let ledger = MemoryLedger::new();

        let mut tx = ledger.begin(ctx("tx1"));
        tx.put_private_data("secret", "k1", b"hidden".to_vec()).unwrap();
        tx.commit().unwrap();

        let mut tx = ledger.begin(ctx("tx2"));
        assert_eq!(tx.get_state("k1").unwrap(), None);
        assert_eq!(
            tx.get_private_data("secret", "k1").unwrap(),
            Some(b"hidden".to_vec())
        );

        tx.del_private_data("secret", "k1").unwrap();
        tx.commit().unwrap();
        assert_eq!(ledger.len("private:secret").unwrap(), 0);
    }

    #[test]
    fn test_paginated_query() {
        let ledger = MemoryLedger::new();
        for i in 0..5 {
            let doc = format!(r#"{{"owner":"o1","n":{}}}"#, i);
            ledger
                .seed(NS_STATE, &format!("DOC_{}", i), doc.into_bytes())
                .unwrap();
        }
        ledger
            .seed(NS_STATE, "DOC_x", br#"{"owner":"o2"}"#.to_vec())
            .unwrap();

        let query = r#"{"selector":{"owner":"o1"}}"#;
        let mut tx = ledger.begin(ctx("tx1"));

        let (page1, meta1) = tx.get_query_result_with_pagination(query, 2, "").unwrap();
        assert_eq!(meta1.fetched_records_count, 2);
        assert_eq!(page1[0].key, "DOC_0");

        let (page2, meta2) = tx
            .get_query_result_with_pagination(query, 2, &meta1.bookmark)
            .unwrap();
        assert_eq!(page2[0].key, "DOC_2");

        let (page3, meta3) = tx
            .get_query_result_with_pagination(query, 2, &meta2.bookmark)
            .unwrap();
        assert_eq!(page3.len(), 1);

        let (page4, meta4) = tx
            .get_query_result_with_pagination(query, 2, &meta3.bookmark)
            .unwrap();
        assert!(page4.is_empty());
        assert_eq!(meta4.bookmark, meta3.bookmark);
    }

    #[test]
    fn test_empty_key_rejected() {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.begin(ctx("tx1"));
        assert!(matches!(
            tx.put_state("", b"v".to_vec()),
            Err(LedgerError::InvalidKey(_))
        ));
    }
}
