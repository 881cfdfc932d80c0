//! Salted PIN credential.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use kid_crypto::{constant_time_compare, generate_salt, hash_pin};
use serde::{Deserialize, Serialize};

/// PIN credential
///
/// Only the salted hash is stored. A PIN is never mutated in place: rotating
/// it builds a new credential with a fresh salt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub hash: String,
    pub salt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<DateTime<Utc>>,
}

impl Pin {
    /// Build a credential for `code` under a freshly generated salt
    pub fn new(code: &str) -> Result<Self> {
        let salt = generate_salt()?;
        let hash = hash_pin(&salt, code);
        Ok(Self {
            hash,
            salt,
            updated_time: None,
        })
    }

    pub fn create_hash(&self, code: &str) -> String {
        hash_pin(&self.salt, code)
    }

    /// Check `code` against the stored hash in constant time
    pub fn matches(&self, code: &str) -> bool {
        constant_time_compare(self.create_hash(code).as_bytes(), self.hash.as_bytes())
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pin")
            .field("hash", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("updated_time", &self.updated_time)
            .finish()
    }
}
