//! Cryptographic constants.
//!
//! These values are part of the persisted key space. Changing any of them
//! requires a migration of every stored KID and certificate document.

/// Output length of every SHAKE256 digest, in bytes
pub const DIGEST_SIZE: usize = 32;

/// Length of a PIN salt before encoding, in bytes
pub const PIN_SALT_SIZE: usize = 32;

/// Separator placed between the salt and the PIN code before hashing
pub const PIN_SEPARATOR: &str = "|";
