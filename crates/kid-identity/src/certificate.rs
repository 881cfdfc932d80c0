//! Certificate record.

use crate::errors::{IdentityError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binding of a client certificate serial number to a KID
///
/// Active until `revoked_time` is set; revocation is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Public id of the owning KID
    #[serde(rename = "@certificate")]
    pub owner: String,
    /// Hex-encoded serial number
    pub sn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_time: Option<DateTime<Utc>>,
}

impl Certificate {
    pub fn new(owner: &str, sn: &str) -> Self {
        Self {
            owner: owner.to_string(),
            sn: sn.to_string(),
            created_time: None,
            revoked_time: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_time.is_some()
    }

    /// Succeeds only while the certificate is active
    pub fn validate(&self) -> Result<()> {
        if self.is_revoked() {
            return Err(IdentityError::Revoked);
        }
        Ok(())
    }

    /// Move to the revoked state
    ///
    /// The first revocation time is final.
    pub fn revoke(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.is_revoked() {
            return Err(IdentityError::AlreadyRevoked);
        }
        self.revoked_time = Some(at);
        Ok(())
    }
}
