//! # kid-identity
//!
//! Pseudonymous identity (KID) registry.
//!
//! This crate is responsible for:
//! - Issuing exactly one KID per client, guarded by a salted PIN
//! - Registering and revoking client certificates under a KID
//! - Migrating KIDs written to the legacy private collection
//! - Paginated certificate listings
//! - Dispatching named invocations to those use cases

#![warn(clippy::all)]

pub mod certificate;
pub mod chaincode;
pub mod constants;
pub mod errors;
pub mod identity;
pub mod kid;
pub mod pin;
pub mod queries;
pub mod stub;


pub use certificate::Certificate;
pub use chaincode::{Chaincode, Response};
pub use errors::{ErrorKind, IdentityError, Result};
pub use identity::Identity;
pub use kid::Kid;
pub use pin::Pin;
pub use queries::QueryResult;
pub use stub::{IdentityStub, StubConfig};
