//! File-backed vault for sealed license copies.
//!
//! One sealed blob per tenant under `dirs::data_dir()/<namespace>/`.
//! Writes go through temp file + rename so a crash never leaves a torn
//! record. Tenant IDs are hashed for filenames to keep identifiers out of
//! the filesystem.

use crate::crypto::seal::SealedBlob;
use crate::TenantgateError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

/// File-backed sealed-license store.
pub struct LicenseVault {
    vault_dir: PathBuf,
}

impl LicenseVault {
    /// Create a vault under the platform data directory.
    pub fn new(namespace: &str) -> Result<Self, TenantgateError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| TenantgateError::VaultIO("Could not find data directory".to_string()))?;
        Self::with_path(base_dir.join(namespace))
    }

    /// Create a vault at a specific path (used by tests).
    pub fn with_path(vault_dir: PathBuf) -> Result<Self, TenantgateError> {
        fs::create_dir_all(&vault_dir)
            .map_err(|e| TenantgateError::VaultIO(format!("Failed to create vault dir: {}", e)))?;
        Ok(Self { vault_dir })
    }

    fn record_path(&self, tenant_id: &str) -> PathBuf {
        // First 16 hex chars of the hash keep filenames short and opaque.
        let digest = hex::encode(Sha256::digest(tenant_id.as_bytes()));
        self.vault_dir.join(format!("{}.json", &digest[..16]))
    }

    /// Save a sealed blob for a tenant atomically.
    pub fn save(&self, tenant_id: &str, blob: &SealedBlob) -> Result<(), TenantgateError> {
        let target_path = self.record_path(tenant_id);
        let temp_path = target_path.with_extension("tmp");

        let json = serde_json::to_string_pretty(blob)
            .map_err(|e| TenantgateError::VaultIO(format!("Failed to serialize blob: {}", e)))?;

        fs::write(&temp_path, &json)
            .map_err(|e| TenantgateError::VaultIO(format!("Failed to write temp file: {}", e)))?;
        fs::rename(&temp_path, &target_path)
            .map_err(|e| TenantgateError::VaultIO(format!("Failed to rename vault file: {}", e)))?;

        Ok(())
    }

    /// Load a tenant's sealed blob, if one exists.
    pub fn load(&self, tenant_id: &str) -> Result<Option<SealedBlob>, TenantgateError> {
        let path = self.record_path(tenant_id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| TenantgateError::VaultIO(format!("Failed to read vault file: {}", e)))?;
        let blob = serde_json::from_str(&json)
            .map_err(|e| TenantgateError::VaultIO(format!("Failed to parse vault file: {}", e)))?;
        Ok(Some(blob))
    }

    /// Delete a tenant's sealed blob.
    pub fn delete(&self, tenant_id: &str) -> Result<(), TenantgateError> {
        let path = self.record_path(tenant_id);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| TenantgateError::VaultIO(format!("Failed to delete blob: {}", e)))?;
        }
        Ok(())
    }
}
