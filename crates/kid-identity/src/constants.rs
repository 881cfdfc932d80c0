//! Ledger keys, transient input names and defaults.

/// Prefix of the KID document key: `KID_<fingerprint>`
pub const KID_KEY_PREFIX: &str = "KID_";

/// Prefix of the certificate document key: `CERT_<fingerprint>_<sn>`
pub const CERT_KEY_PREFIX: &str = "CERT_";

/// Transient input carrying the current PIN
pub const TRANSIENT_PIN: &str = "kiesnet-id/pin";

/// Transient input carrying the replacement PIN
pub const TRANSIENT_NEW_PIN: &str = "kiesnet-id/new_pin";

/// Private collection where earlier deployments stored KIDs
pub const DEFAULT_LEGACY_COLLECTION: &str = "kiesnet-id";

/// Page size of certificate listings
pub const CERTIFICATES_FETCH_SIZE: usize = 20;
