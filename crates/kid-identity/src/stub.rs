//! Identity repository over a ledger stub.
//!
//! [`IdentityStub`] is the sole owner of persisted KID and certificate
//! state. It derives every key from the caller's platform-asserted identity:
//!
//! - KID: `KID_<fingerprint>` in the world state
//! - Certificate: `CERT_<fingerprint>_<sn>` in the world state
//! - Legacy KID: `KID_<fingerprint>` in the legacy private collection
//!
//! where `fingerprint = hex(SHAKE256(client id))` and `sn` is the minimal
//! big-endian hex encoding of the certificate serial number.

use crate::certificate::Certificate;
use crate::constants::*;
use crate::errors::{IdentityError, Result};
use crate::kid::Kid;
use crate::pin::Pin;
use crate::queries::{kid_by_id_query, not_revoked_certificates_query, QueryResult};
use kid_crypto::shake256_hex;
use kid_ledger::LedgerStub;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Repository configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubConfig {
    /// Private collection searched when the primary KID is absent
    ///
    /// `None` disables the legacy lookup entirely.
    pub legacy_collection: Option<String>,
    /// Move legacy KIDs to the primary key when found
    pub migrate_legacy: bool,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            legacy_collection: Some(DEFAULT_LEGACY_COLLECTION.to_string()),
            migrate_legacy: true,
        }
    }
}

/// Identity repository for one invocation
pub struct IdentityStub<'a, S: LedgerStub + ?Sized> {
    stub: &'a mut S,
    config: &'a StubConfig,
    fingerprint: String,
    sn: String,
}

impl<'a, S: LedgerStub + ?Sized> IdentityStub<'a, S> {
    pub fn new(stub: &'a mut S, config: &'a StubConfig) -> Self {
        let creator = stub.creator();
        let fingerprint = shake256_hex(creator.id.as_bytes());
        let sn = serial_hex(&creator.serial_number);

        Self {
            stub,
            config,
            fingerprint,
            sn,
        }
    }

    /// Hex serial number of the caller's certificate
    pub fn serial_number(&self) -> &str {
        &self.sn
    }

    pub fn tx_id(&self) -> &str {
        self.stub.tx_id()
    }

    /// Transient input decoded as UTF-8
    ///
    /// The copy is wiped when dropped.
    pub fn get_transient(&self, key: &str) -> Option<Zeroizing<String>> {
        self.stub
            .transient(key)
            .map(|bytes| Zeroizing::new(String::from_utf8_lossy(bytes).into_owned()))
    }

    /// Transient PIN code, empty when absent
    pub fn transient_code(&self, key: &str) -> Zeroizing<String> {
        self.get_transient(key)
            .unwrap_or_else(|| Zeroizing::new(String::new()))
    }

    // ========================================================================
    // KID
    // ========================================================================

    pub fn kid_key(&self) -> String {
        format!("{}{}", KID_KEY_PREFIX, self.fingerprint)
    }

    /// Create the caller's KID and write it into the ledger
    ///
    /// The public id is derived from the fingerprint and the transaction id,
    /// so a retried registration never reproduces a predictable id.
    pub fn create_kid(&mut self, pin_code: &str) -> Result<Kid> {
        let key = self.kid_key();
        if self.stub.get_state(&key)?.is_some() {
            return Err(IdentityError::AlreadyRegistered);
        }

        let ts = self.stub.tx_timestamp();
        let mut kid = Kid::new(&self.fingerprint, self.stub.tx_id());

        // Guards against a hash collision with another client's KID
        let duplicates = self.stub.get_query_result(&kid_by_id_query(&kid.id))?;
        if !duplicates.is_empty() {
            warn!(tx_id = %self.stub.tx_id(), "Generated KID collides with an existing one");
            return Err(IdentityError::DuplicateKid);
        }

        let mut pin = Pin::new(pin_code)?;
        pin.updated_time = Some(ts);

        kid.pin = Some(pin);
        kid.created_time = Some(ts);
        kid.updated_time = Some(ts);
        self.put_kid(&kid)?;

        info!(kid = %kid.id, "KID created");
        Ok(kid)
    }

    /// Retrieve the caller's KID
    ///
    /// The PIN is checked when `secure` is set or a PIN was supplied in the
    /// transient map. A locked KID only answers to its lock certificate.
    pub fn get_kid(&mut self, secure: bool) -> Result<Kid> {
        let kid = match self.stub.get_state(&self.kid_key())? {
            Some(data) => serde_json::from_slice::<Kid>(&data)?,
            None => self
                .get_legacy_kid()?
                .ok_or(IdentityError::NotRegistered)?,
        };

        let code = self.get_transient(TRANSIENT_PIN);
        if secure || code.is_some() {
            kid.verify_pin(code.as_deref().map(String::as_str))?;
        }

        kid.verify_lock(&self.sn)?;
        Ok(kid)
    }

    /// Look up a KID written by an earlier deployment
    ///
    /// When migration is enabled the record moves to the primary key. A
    /// failure to delete the legacy copy is logged and does not fail the
    /// read.
    fn get_legacy_kid(&mut self) -> Result<Option<Kid>> {
        let Some(collection) = self.config.legacy_collection.as_deref() else {
            return Ok(None);
        };

        let key = self.kid_key();
        let Some(data) = self.stub.get_private_data(collection, &key)? else {
            return Ok(None);
        };
        let kid: Kid = serde_json::from_slice(&data)?;

        if self.config.migrate_legacy {
            self.stub.put_state(&key, data)?;
            if let Err(e) = self.stub.del_private_data(collection, &key) {
                warn!(
                    kid = %kid.id,
                    collection,
                    error = %e,
                    "Failed to delete migrated KID from legacy collection"
                );
            }
            info!(kid = %kid.id, collection, "KID migrated from legacy collection");
        }

        Ok(Some(kid))
    }

    /// Write the KID into the ledger
    pub fn put_kid(&mut self, kid: &Kid) -> Result<()> {
        let data = serde_json::to_vec(kid)?;
        self.stub.put_state(&self.kid_key(), data)?;
        Ok(())
    }

    /// Replace the PIN with the transient new PIN
    ///
    /// The caller must have passed a secure `get_kid` in this invocation.
    pub fn update_pin(&mut self, kid: &mut Kid) -> Result<()> {
        let code = self.transient_code(TRANSIENT_NEW_PIN);
        let ts = self.stub.tx_timestamp();

        let mut pin = Pin::new(&code)?;
        pin.updated_time = Some(ts);

        kid.pin = Some(pin);
        kid.updated_time = Some(ts);
        self.put_kid(kid)?;

        info!(kid = %kid.id, "PIN updated");
        Ok(())
    }

    /// Pin the KID to the caller's certificate
    pub fn set_lock(&mut self, kid: &mut Kid) -> Result<()> {
        kid.lock = Some(self.sn.clone());
        kid.updated_time = Some(self.stub.tx_timestamp());
        self.put_kid(kid)?;

        info!(kid = %kid.id, sn = %self.sn, "KID locked");
        Ok(())
    }

    /// Remove the KID's certificate lock
    pub fn clear_lock(&mut self, kid: &mut Kid) -> Result<()> {
        kid.lock = None;
        kid.updated_time = Some(self.stub.tx_timestamp());
        self.put_kid(kid)?;

        info!(kid = %kid.id, "KID unlocked");
        Ok(())
    }

    // ========================================================================
    // Certificate
    // ========================================================================

    pub fn certificate_key(&self, sn: &str) -> String {
        format!("{}{}_{}", CERT_KEY_PREFIX, self.fingerprint, sn)
    }

    /// Register the caller's certificate under `kid`
    pub fn create_certificate(&mut self, kid: &str) -> Result<Certificate> {
        let mut cert = Certificate::new(kid, &self.sn);
        cert.created_time = Some(self.stub.tx_timestamp());
        self.put_certificate(&cert)?;

        info!(kid, sn = %cert.sn, "Certificate registered");
        Ok(cert)
    }

    /// Retrieve a certificate; an empty `sn` means the caller's own
    pub fn get_certificate(&mut self, sn: &str) -> Result<Certificate> {
        let sn = if sn.is_empty() { self.sn.clone() } else { sn.to_string() };

        match self.stub.get_state(&self.certificate_key(&sn))? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Err(IdentityError::NotRegistered),
        }
    }

    /// Write the certificate into the ledger
    pub fn put_certificate(&mut self, cert: &Certificate) -> Result<()> {
        let data = serde_json::to_vec(cert)?;
        self.stub.put_state(&self.certificate_key(&cert.sn), data)?;
        Ok(())
    }

    /// Revoke the certificate and write it into the ledger
    pub fn revoke_certificate(&mut self, cert: &mut Certificate) -> Result<()> {
        cert.revoke(self.stub.tx_timestamp())?;
        self.put_certificate(cert)?;

        info!(kid = %cert.owner, sn = %cert.sn, "Certificate revoked");
        Ok(())
    }

    /// One page of the live certificates owned by `kid`
    pub fn query_certificates(&mut self, kid: &str, bookmark: &str) -> Result<QueryResult> {
        let query = not_revoked_certificates_query(kid);
        let (records, meta) = self.stub.get_query_result_with_pagination(
            &query,
            CERTIFICATES_FETCH_SIZE,
            bookmark,
        )?;

        QueryResult::new(meta, records)
    }
}

/// Hex encoding of a big-endian serial number without leading zero bytes
pub fn serial_hex(serial_number: &[u8]) -> String {
    let start = serial_number
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(serial_number.len());
    hex::encode(&serial_number[start..])
}

/// Bring a hex serial number into the form produced by [`serial_hex`]
///
/// Lowercases, pads an odd digit count and drops leading zero bytes.
pub fn normalize_serial(sn: &str) -> String {
    let mut sn = sn.to_ascii_lowercase();
    if sn.len() % 2 == 1 {
        sn.insert(0, '0');
    }
    let mut digits = sn.as_str();
    while digits.len() > 2 && digits.starts_with("00") {
        digits = &digits[2..];
    }
    digits.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_serial() {
        assert_eq!(normalize_serial("AA"), "aa");
        assert_eq!(normalize_serial("00bb"), "bb");
        assert_eq!(normalize_serial("0000BB"), "bb");
        assert_eq!(normalize_serial("abb"), "0abb");
        assert_eq!(normalize_serial(""), "");
        assert_eq!(normalize_serial(&serial_hex(&[0x00, 0x01, 0xFF])), "01ff");
    }

    #[test]
    fn test_serial_hex_strips_leading_zeros() {
        assert_eq!(serial_hex(&[0x00, 0x00, 0xAA, 0x01]), "aa01");
        assert_eq!(serial_hex(&[0x0A]), "0a");
        assert_eq!(serial_hex(&[0x00]), "");
        assert_eq!(serial_hex(&[]), "");
    }

    #[test]
    fn test_default_config() {
        let config = StubConfig::default();
        assert_eq!(config.legacy_collection.as_deref(), Some("kiesnet-id"));
        assert!(config.migrate_legacy);
    }
}
