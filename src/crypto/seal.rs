//! At-rest sealing of cached license copies.
//!
//! Cached licenses are encrypted with ChaCha20-Poly1305 and carry an
//! integrity hash of `SHA-256(ciphertext || key_version)`. Every read
//! recomputes the hash before decryption; a mismatch marks the copy as
//! tampered and it is rejected for use, never silently accepted.

use crate::TenantgateError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Nonce length for ChaCha20-Poly1305 (12 bytes).
pub const NONCE_LEN: usize = 12;

/// Sealed (encrypted + integrity-hashed) blob as stored in the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedBlob {
    /// Base64-encoded ciphertext (includes the Poly1305 auth tag).
    pub ciphertext: String,

    /// Base64-encoded nonce used for this seal.
    pub nonce: String,

    /// Version of the sealing key this blob was produced with.
    pub key_version: u32,

    /// Hex SHA-256 over `ciphertext_bytes || key_version_le`.
    pub integrity_hash: String,
}

/// Compute the integrity hash binding ciphertext to the key version.
fn integrity_hash(ciphertext: &[u8], key_version: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ciphertext);
    hasher.update(key_version.to_le_bytes());
    hex::encode(hasher.finalize())
}

/// Seal a plaintext payload under the given key.
pub fn seal(
    plaintext: &[u8],
    key: &[u8; 32],
    key_version: u32,
) -> Result<SealedBlob, TenantgateError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| TenantgateError::Crypto(format!("Sealing failed: {}", e)))?;

    Ok(SealedBlob {
        integrity_hash: integrity_hash(&ciphertext, key_version),
        ciphertext: STANDARD.encode(&ciphertext),
        nonce: STANDARD.encode(nonce_bytes),
        key_version,
    })
}

/// Unseal a blob, enforcing the integrity hash before decryption.
///
/// # Errors
/// * `Tampered` - integrity hash mismatch, wrong key version binding, or
///   auth-tag failure during decryption
/// * `Crypto` - malformed base64 fields
pub fn unseal(blob: &SealedBlob, key: &[u8; 32]) -> Result<Vec<u8>, TenantgateError> {
    let ciphertext = STANDARD
        .decode(&blob.ciphertext)
        .map_err(|e| TenantgateError::Crypto(format!("Invalid ciphertext base64: {}", e)))?;

    // Integrity check first: a flipped byte or a rewound key_version is
    // tampering, reported distinctly from decryption failure.
    if integrity_hash(&ciphertext, blob.key_version) != blob.integrity_hash {
        return Err(TenantgateError::Tampered);
    }

    let nonce_bytes = STANDARD
        .decode(&blob.nonce)
        .map_err(|e| TenantgateError::Crypto(format!("Invalid nonce base64: {}", e)))?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(TenantgateError::Crypto(format!(
            "Nonce must be {} bytes, got {}",
            NONCE_LEN,
            nonce_bytes.len()
        )));
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
        .map_err(|_| TenantgateError::Tampered)
}
