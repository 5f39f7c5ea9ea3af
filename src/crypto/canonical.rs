//! Canonical payload serialization for signing.
//!
//! The license signature covers a deterministic byte sequence: the JSON
//! value with the `signature` field removed, serialized with stable key
//! ordering. `serde_json`'s default map is a `BTreeMap`, so object keys
//! come out sorted as long as the `preserve_order` feature stays off.

use crate::TenantgateError;
use serde::Serialize;
use serde_json::Value;

/// The field excluded from the signed byte sequence.
pub const SIGNATURE_FIELD: &str = "signature";

/// Serialize a payload to its canonical signing bytes.
///
/// The top-level `signature` key, if present, is stripped before
/// serialization so sign and verify operate over identical input.
pub fn canonical_bytes<T: Serialize>(payload: &T) -> Result<Vec<u8>, TenantgateError> {
    let mut value = serde_json::to_value(payload)
        .map_err(|e| TenantgateError::Crypto(format!("Canonicalization failed: {}", e)))?;

    if let Value::Object(ref mut map) = value {
        map.remove(SIGNATURE_FIELD);
    }

    serde_json::to_vec(&value)
        .map_err(|e| TenantgateError::Crypto(format!("Canonicalization failed: {}", e)))
}
