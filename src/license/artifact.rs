//! License artifact wire format and structural validation.
//!
//! The artifact is the JSON file issued by the license authority. It is
//! validated structurally (required fields, key format, tier enum,
//! non-negative limits, date ordering) before any signature check runs;
//! a malformed file never reaches the crypto layer.

use crate::crypto::mac::verify_payload;
use crate::registry::Tier;
use crate::TenantgateError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Grant for a single module within the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleGrant {
    /// Whether the module is granted.
    pub enabled: bool,
    /// Commercial tier the grant was sold at.
    pub tier: Tier,
    /// Quota limits for this grant.
    #[serde(default)]
    pub limits: BTreeMap<String, i64>,
}

/// Signed license artifact as issued by the license authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseArtifact {
    /// License key in `HRMS-XXXX-XXXX-XXXX` format.
    pub license_key: String,
    /// Tenant (company) identifier.
    pub company_id: String,
    /// Tenant display name.
    pub company_name: String,
    /// Issue date (`YYYY-MM-DD`).
    pub issued_at: NaiveDate,
    /// Expiry date (`YYYY-MM-DD`).
    pub expires_at: NaiveDate,
    /// Module grants keyed by module key.
    pub modules: BTreeMap<String, ModuleGrant>,
    /// Hex HMAC-SHA256 over the artifact with this field removed.
    pub signature: String,
}

/// Check the `HRMS-XXXX-XXXX-XXXX` key shape: four dash-separated groups,
/// literal `HRMS` prefix, three groups of four uppercase alphanumerics.
fn license_key_well_formed(key: &str) -> bool {
    let parts: Vec<&str> = key.split('-').collect();
    if parts.len() != 4 || parts[0] != "HRMS" {
        return false;
    }
    parts[1..].iter().all(|group| {
        group.len() == 4
            && group
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    })
}

impl LicenseArtifact {
    /// Parse an artifact from JSON, applying structural validation.
    ///
    /// Signature verification is a separate step (`verify_signature`);
    /// structurally invalid files are rejected before it.
    pub fn from_json(json: &str) -> Result<Self, TenantgateError> {
        let artifact: Self = serde_json::from_str(json)
            .map_err(|e| TenantgateError::Structure(format!("Malformed license file: {}", e)))?;
        artifact.validate_structure()?;
        Ok(artifact)
    }

    /// Validate required fields, key format, date ordering, and limits.
    pub fn validate_structure(&self) -> Result<(), TenantgateError> {
        if !license_key_well_formed(&self.license_key) {
            return Err(TenantgateError::Structure(format!(
                "license key '{}' does not match HRMS-XXXX-XXXX-XXXX",
                self.license_key
            )));
        }
        if self.company_id.is_empty() {
            return Err(TenantgateError::Structure(
                "companyId cannot be empty".to_string(),
            ));
        }
        if self.company_name.is_empty() {
            return Err(TenantgateError::Structure(
                "companyName cannot be empty".to_string(),
            ));
        }
        if self.expires_at < self.issued_at {
            return Err(TenantgateError::Structure(format!(
                "expiresAt {} precedes issuedAt {}",
                self.expires_at, self.issued_at
            )));
        }
        for (key, grant) in &self.modules {
            if key.is_empty() {
                return Err(TenantgateError::Structure(
                    "module grant with empty key".to_string(),
                ));
            }
            if let Some((limit, value)) = grant.limits.iter().find(|(_, v)| **v < 0) {
                return Err(TenantgateError::Structure(format!(
                    "module '{}' limit '{}' is negative ({})",
                    key, limit, value
                )));
            }
        }
        Ok(())
    }

    /// Verify the artifact signature against the shared secret.
    ///
    /// # Errors
    /// * `SignatureMismatch` - recomputed tag differs (tamper or forgery)
    pub fn verify_signature(&self, secret: &str) -> Result<(), TenantgateError> {
        if verify_payload(self, &self.signature, secret)? {
            Ok(())
        } else {
            Err(TenantgateError::SignatureMismatch)
        }
    }

    /// Keys of modules granted (enabled) by this artifact, sorted.
    pub fn granted_modules(&self) -> Vec<String> {
        self.modules
            .iter()
            .filter(|(_, grant)| grant.enabled)
            .map(|(key, _)| key.clone())
            .collect()
    }
}
