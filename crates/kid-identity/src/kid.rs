//! KID entity.

use crate::errors::{IdentityError, Result};
use crate::pin::Pin;
use chrono::{DateTime, Utc};
use kid_crypto::shake256_hex;
use serde::{Deserialize, Serialize};

/// Pseudonymous identity record
///
/// `owner` is the client fingerprint and doubles as the storage key, so a
/// client can hold at most one KID. `id` is the public identifier handed to
/// other applications; it is derived from the fingerprint and the
/// registering transaction's id and cannot be recomputed from the
/// fingerprint alone.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kid {
    #[serde(rename = "@kid")]
    pub owner: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<Pin>,
    /// Serial number of the only certificate allowed to operate this KID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<DateTime<Utc>>,
}

impl Kid {
    pub fn new(fingerprint: &str, nonce: &str) -> Self {
        Self {
            owner: fingerprint.to_string(),
            id: Self::create_hash(&format!("{}{}", fingerprint, nonce)),
            pin: None,
            lock: None,
            created_time: None,
            updated_time: None,
        }
    }

    pub fn create_hash(raw_id: &str) -> String {
        shake256_hex(raw_id.as_bytes())
    }

    /// Verify a supplied PIN code
    ///
    /// A PIN-less record accepts only an absent or empty code.
    pub fn verify_pin(&self, code: Option<&str>) -> Result<()> {
        match (&self.pin, code) {
            (Some(pin), code) if pin.matches(code.unwrap_or_default()) => Ok(()),
            (Some(_), _) => Err(IdentityError::MismatchedPin),
            (None, Some(code)) if !code.is_empty() => Err(IdentityError::MismatchedPin),
            (None, _) => Ok(()),
        }
    }

    /// Verify that the certificate `sn` may operate this KID
    pub fn verify_lock(&self, sn: &str) -> Result<()> {
        match &self.lock {
            Some(lock) if lock != sn => Err(IdentityError::NotLocked),
            _ => Ok(()),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

impl std::fmt::Debug for Kid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kid")
            .field("id", &self.id)
            .field("pin", &self.pin)
            .field("lock", &self.lock)
            .field("created_time", &self.created_time)
            .field("updated_time", &self.updated_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_derivation() {
        let kid = Kid::new("c1", "tx1");
        assert_eq!(kid.owner, "c1");
        assert_eq!(kid.id, shake256_hex(b"c1tx1"));
        assert_ne!(kid.id, Kid::new("c1", "tx2").id);
        assert_ne!(kid.id, shake256_hex(b"c1"));
    }

    #[test]
    fn test_verify_pin() {
        let mut kid = Kid::new("c1", "tx1");
        kid.pin = Some(Pin::new("1234").unwrap());

        assert!(kid.verify_pin(Some("1234")).is_ok());
        assert!(matches!(
            kid.verify_pin(Some("0000")),
            Err(IdentityError::MismatchedPin)
        ));
        assert!(matches!(
            kid.verify_pin(None),
            Err(IdentityError::MismatchedPin)
        ));
    }

    #[test]
    fn test_verify_pin_without_credential() {
        let kid = Kid::new("c1", "tx1");

        assert!(kid.verify_pin(None).is_ok());
        assert!(kid.verify_pin(Some("")).is_ok());
        assert!(matches!(
            kid.verify_pin(Some("1234")),
            Err(IdentityError::MismatchedPin)
        ));
    }

    #[test]
    fn test_verify_lock() {
        let mut kid = Kid::new("c1", "tx1");
        assert!(kid.verify_lock("aa").is_ok());

        kid.lock = Some("aa".to_string());
        assert!(kid.is_locked());
        assert!(kid.verify_lock("aa").is_ok());
        assert!(matches!(kid.verify_lock("bb"), Err(IdentityError::NotLocked)));
    }

    #[test]
    fn test_document_shape() {
        let kid = Kid::new("c1", "tx1");
        let value = serde_json::to_value(&kid).unwrap();

        assert_eq!(value["@kid"], "c1");
        assert_eq!(value["id"], kid.id.as_str());
        assert!(value.get("pin").is_none());
        assert!(value.get("lock").is_none());
    }

    #[test]
    fn test_debug_omits_fingerprint() {
        let kid = Kid::new("fingerprint-value", "tx1");
        assert!(!format!("{:?}", kid).contains("fingerprint-value"));
    }
}
