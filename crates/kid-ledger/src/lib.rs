//! # kid-ledger
//!
//! Ledger abstraction consumed by the KID registry.
//!
//! The registry never talks to a storage engine directly. It sees a
//! [`LedgerStub`]: one transaction's view of the world state, with a
//! deterministic timestamp, a transaction id, the caller's identity and a
//! map of transient inputs that are never persisted.
//!
//! Two backends are provided:
//! - [`MemoryLedger`] for tests and embedding
//! - [`RocksDbLedger`] for a durable local ledger
//!
//! Both run transactions through [`Transaction`], which buffers writes and
//! validates the read set at commit time.

#![warn(clippy::all)]

pub mod context;
pub mod errors;
pub mod memory;
pub mod namespaces;
pub mod rocksdb_impl;
pub mod selector;
pub mod traits;
pub mod transaction;

pub use context::{ClientIdentity, TxContext};
pub use errors::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use namespaces::*;
pub use rocksdb_impl::RocksDbLedger;
pub use selector::{Query, Selector};
pub use traits::{Backend, BackendExt, LedgerStub, QueryRecord, QueryResponseMetadata, Versioned};
pub use transaction::Transaction;
