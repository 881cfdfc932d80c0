//! # kid-crypto
//!
//! Hashing primitives for the KID registry.
//!
//! ## Security Properties
//!
//! - SHAKE256 with a fixed 32-byte output for every persisted digest
//! - Salts drawn from the OS CSPRNG
//! - Constant-time comparison of derived hashes
//! - No unsafe code

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod errors;
pub mod hashing;

pub use constants::*;
pub use errors::{CryptoError, Result};
pub use hashing::*;
