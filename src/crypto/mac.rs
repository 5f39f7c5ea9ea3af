//! Keyed license signatures (HMAC-SHA256).
//!
//! Signatures are computed over the canonical payload bytes with the
//! top-level `signature` field removed, and rendered as lowercase hex.
//! Verification is constant-time via `Mac::verify_slice`.

use crate::crypto::canonical::canonical_bytes;
use crate::TenantgateError;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a payload with the shared license secret.
///
/// Returns the hex-encoded HMAC-SHA256 tag over the canonical bytes.
pub fn sign_payload<T: Serialize>(payload: &T, secret: &str) -> Result<String, TenantgateError> {
    let bytes = canonical_bytes(payload)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TenantgateError::Crypto(format!("HMAC key setup failed: {}", e)))?;
    mac.update(&bytes);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex signature against a payload and the shared secret.
///
/// Returns `Ok(true)` only when the recomputed tag matches; the comparison
/// is constant-time. Malformed hex is treated as a failed verification,
/// not an error, so callers get a single rejection path.
pub fn verify_payload<T: Serialize>(
    payload: &T,
    signature_hex: &str,
    secret: &str,
) -> Result<bool, TenantgateError> {
    let Ok(expected) = hex::decode(signature_hex) else {
        return Ok(false);
    };

    let bytes = canonical_bytes(payload)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TenantgateError::Crypto(format!("HMAC key setup failed: {}", e)))?;
    mac.update(&bytes);

    Ok(mac.verify_slice(&expected).is_ok())
}
