//! Per-tenant license record.
//!
//! Plain immutable data: mutation happens only through `LicenseStore`,
//! which re-signs and re-hashes on every update. Business logic receives
//! `Arc<LicenseRecord>` snapshots and never mutates in place.

use crate::clock::Clock;
use crate::crypto::mac::{sign_payload, verify_payload};
use crate::license::artifact::LicenseArtifact;
use crate::TenantgateError;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// License lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// In force.
    Active,
    /// Past its expiry date.
    Expired,
    /// Withdrawn by the license authority.
    Revoked,
}

/// Contractual feature limits and module grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseFeatures {
    /// Maximum concurrent users.
    pub max_users: u64,
    /// Maximum storage in megabytes.
    pub max_storage: u64,
    /// Maximum API calls per calendar month.
    pub max_api_calls_per_month: u64,
    /// Module keys covered by the license.
    pub modules: Vec<String>,
}

/// Integrity metadata for the at-rest copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityInfo {
    /// Hex hash of the sealed ciphertext bound to the key version.
    pub integrity_hash: String,
    /// When the hash was last recomputed and compared.
    pub last_integrity_check: Option<DateTime<Utc>>,
    /// Set when a mismatch is observed; the record is then rejected.
    pub tamper_detection: bool,
    /// When the sealing key was last rotated.
    pub key_rotation_date: Option<DateTime<Utc>>,
}

/// Offline-grace policy attached to the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflinePolicy {
    /// Whether offline operation is permitted at all.
    pub enabled: bool,
    /// Grace window length in hours.
    pub grace_hours: i64,
    /// Deadline of the current grace window, set on losing connectivity.
    pub grace_deadline: Option<DateTime<Utc>>,
}

/// Per-tenant license record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// Owning tenant.
    pub tenant_id: String,
    /// License number from the issuing artifact.
    pub license_number: String,
    /// Lifecycle status.
    pub status: LicenseStatus,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Contractual limits and module grants.
    pub features: LicenseFeatures,
    /// Hex HMAC over the record with this field removed.
    pub signature: String,
    /// At-rest integrity metadata.
    pub integrity: IntegrityInfo,
    /// Offline-grace policy.
    pub offline: OfflinePolicy,
}

impl LicenseRecord {
    /// Build an unsigned record from a validated artifact.
    ///
    /// Resource limits are taken as the maximum of each granted module's
    /// limits; the store signs and seals the result.
    pub fn from_artifact(
        artifact: &LicenseArtifact,
        grace_hours: i64,
        clock: &dyn Clock,
    ) -> Self {
        let limit = |name: &str| {
            artifact
                .modules
                .values()
                .filter(|grant| grant.enabled)
                .filter_map(|grant| grant.limits.get(name).copied())
                .max()
                .unwrap_or(0)
                .max(0) as u64
        };

        let midnight = NaiveTime::MIN;
        Self {
            tenant_id: artifact.company_id.clone(),
            license_number: artifact.license_key.clone(),
            status: LicenseStatus::Active,
            issued_at: artifact.issued_at.and_time(midnight).and_utc(),
            expires_at: artifact.expires_at.and_time(midnight).and_utc(),
            features: LicenseFeatures {
                max_users: limit("maxUsers"),
                max_storage: limit("maxStorage"),
                max_api_calls_per_month: limit("maxAPICallsPerMonth"),
                modules: artifact.granted_modules(),
            },
            signature: String::new(),
            integrity: IntegrityInfo {
                integrity_hash: String::new(),
                last_integrity_check: None,
                tamper_detection: false,
                key_rotation_date: None,
            },
            offline: OfflinePolicy {
                enabled: grace_hours > 0,
                grace_hours,
                grace_deadline: None,
            },
        }
        .stamped(clock)
    }

    fn stamped(mut self, clock: &dyn Clock) -> Self {
        self.integrity.last_integrity_check = Some(clock.now_utc());
        self
    }

    /// Re-sign the record with the shared secret.
    ///
    /// The signature covers the canonical record with the `signature`
    /// field removed; integrity metadata is part of the signed payload so
    /// a flipped `tamperDetection` flag also invalidates the signature.
    pub fn resign(&mut self, secret: &str) -> Result<(), TenantgateError> {
        self.signature = String::new();
        self.signature = sign_payload(self, secret)?;
        Ok(())
    }

    /// Verify the record signature.
    pub fn verify_signature(&self, secret: &str) -> Result<(), TenantgateError> {
        if verify_payload(self, &self.signature, secret)? {
            Ok(())
        } else {
            Err(TenantgateError::SignatureMismatch)
        }
    }

    /// Whether the license is usable at the given instant.
    ///
    /// Requires `Active` status, an unexpired date, and no tamper flag.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == LicenseStatus::Active && now < self.expires_at && !self.integrity.tamper_detection
    }

    /// Whole days until expiry (negative once past).
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days()
    }

    /// Whether the license covers a module.
    pub fn covers(&self, module_key: &str) -> bool {
        self.features.modules.iter().any(|m| m == module_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::license::artifact::test_fixtures::signed_artifact;

    const SECRET: &str = "record-test-secret-0123456789";

    fn record() -> LicenseRecord {
        let clock = MockClock::from_rfc3339("2026-06-01T00:00:00Z");
        LicenseRecord::from_artifact(&signed_artifact(&["hr-core", "payroll"]), 72, &clock)
    }

    #[test]
    fn from_artifact_copies_grants() {
        let record = record();
        assert_eq!(record.tenant_id, "tenant-1");
        assert_eq!(record.license_number, "HRMS-A1B2-C3D4-E5F6");
        assert_eq!(record.status, LicenseStatus::Active);
        assert!(record.covers("payroll"));
        assert!(!record.covers("clinic"));
        assert!(record.offline.enabled);
        assert_eq!(record.offline.grace_hours, 72);
    }

    #[test]
    fn resign_verify_roundtrip() {
        let mut record = record();
        record.resign(SECRET).unwrap();
        record.verify_signature(SECRET).unwrap();
    }

    #[test]
    fn mutation_invalidates_signature() {
        let mut record = record();
        record.resign(SECRET).unwrap();
        record.features.max_users = 9999;
        assert!(matches!(
            record.verify_signature(SECRET),
            Err(TenantgateError::SignatureMismatch)
        ));
    }

    #[test]
    fn tamper_flag_is_signed_too() {
        let mut record = record();
        record.resign(SECRET).unwrap();
        record.integrity.tamper_detection = true;
        assert!(matches!(
            record.verify_signature(SECRET),
            Err(TenantgateError::SignatureMismatch)
        ));
    }

    #[test]
    fn validity_window() {
        let record = record();
        let before = "2026-12-31T23:59:59Z".parse().unwrap();
        let after = "2027-01-01T00:00:01Z".parse().unwrap();
        assert!(record.is_valid(before));
        assert!(!record.is_valid(after));
    }

    #[test]
    fn revoked_record_is_invalid() {
        let mut record = record();
        record.status = LicenseStatus::Revoked;
        assert!(!record.is_valid("2026-06-01T00:00:00Z".parse().unwrap()));
    }

    #[test]
    fn tampered_record_is_invalid() {
        let mut record = record();
        record.integrity.tamper_detection = true;
        assert!(!record.is_valid("2026-06-01T00:00:00Z".parse().unwrap()));
    }

    #[test]
    fn days_until_expiry_counts_down() {
        let record = record();
        let now = "2026-12-27T00:00:00Z".parse().unwrap();
        assert_eq!(record.days_until_expiry(now), 5);
    }
}
