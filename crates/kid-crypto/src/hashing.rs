//! Hashing utilities using SHAKE256.

use crate::{constants::*, errors::*};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Hash data with SHAKE256, reading `DIGEST_SIZE` bytes of output
pub fn shake256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Shake256::default();
    hasher.update(data);
    let mut reader = hasher.finalize_xof();
    let mut out = [0u8; DIGEST_SIZE];
    reader.read(&mut out);
    out
}

/// Hash data with SHAKE256 and hex-encode the digest
pub fn shake256_hex(data: &[u8]) -> String {
    hex::encode(shake256(data))
}

/// Hash a PIN code under a salt.
///
/// Computes `hex(SHAKE256(salt || "|" || code))`. The concatenated input is
/// wiped before returning.
pub fn hash_pin(salt: &str, code: &str) -> String {
    let mut input = Vec::with_capacity(salt.len() + PIN_SEPARATOR.len() + code.len());
    input.extend_from_slice(salt.as_bytes());
    input.extend_from_slice(PIN_SEPARATOR.as_bytes());
    input.extend_from_slice(code.as_bytes());

    let digest = shake256_hex(&input);
    input.zeroize();
    digest
}

/// Generate a random PIN salt, base64url-encoded without padding
pub fn generate_salt() -> Result<String> {
    let mut salt = [0u8; PIN_SALT_SIZE];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::RandomGenerationFailed(e.to_string()))?;

    let encoded = URL_SAFE_NO_PAD.encode(salt);
    salt.zeroize();
    Ok(encoded)
}

/// Securely compare two byte slices in constant time
///
/// Slices of different lengths compare unequal without inspecting content.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
