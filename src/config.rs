//! Tenantgate configuration.

use std::time::Duration;

/// Policy for quota violations identified by the compliance analyzer.
///
/// Whether exceeding a contractual limit blocks the triggering operation
/// is a deployment choice, not a fixed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaPolicy {
    /// Violations are recorded and reported but never block operations.
    #[default]
    Advisory,
    /// `*_limit_exceeded` violations fail the triggering operation.
    Enforcing,
}

/// Configuration for the license and entitlement engine.
#[derive(Debug, Clone)]
pub struct TenantgateConfig {
    /// Shared secret for the HMAC license signature.
    /// SECURITY: provision through deployment secrets, never commit.
    pub license_secret: String,

    /// 256-bit key for sealing at-rest license copies.
    pub sealing_key: [u8; 32],

    /// Version of the sealing key, bound into the integrity hash so a
    /// rotated key invalidates old copies.
    pub key_version: u32,

    /// Vault namespace for sealed license copies.
    /// Each deployment should use a unique namespace to avoid collisions.
    pub vault_namespace: String,

    /// Grace period for offline operation.
    /// Cached sealed licenses remain usable for this duration after
    /// connectivity to the license service is lost.
    pub offline_grace: Duration,

    /// Audit retention horizon in days. Critical events are retained
    /// indefinitely regardless of this value.
    pub audit_retention_days: i64,

    /// Quota violation policy.
    pub quota_policy: QuotaPolicy,
}

/// Default audit retention horizon (days).
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 365;

/// Default offline grace window.
pub const DEFAULT_OFFLINE_GRACE: Duration = Duration::from_secs(72 * 3600);

impl TenantgateConfig {
    /// Config with the default grace window, retention horizon, key
    /// version, and quota policy.
    pub fn with_defaults(
        license_secret: String,
        sealing_key: [u8; 32],
        vault_namespace: String,
    ) -> Self {
        Self {
            license_secret,
            sealing_key,
            key_version: 1,
            vault_namespace,
            offline_grace: DEFAULT_OFFLINE_GRACE,
            audit_retention_days: DEFAULT_AUDIT_RETENTION_DAYS,
            quota_policy: QuotaPolicy::default(),
        }
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::TenantgateError> {
        if self.license_secret.len() < 16 {
            return Err(crate::TenantgateError::Config(
                "license_secret must be at least 16 characters".to_string(),
            ));
        }
        if self.vault_namespace.is_empty() {
            return Err(crate::TenantgateError::Config(
                "vault_namespace cannot be empty".to_string(),
            ));
        }
        // The grace window is carried on license records in whole hours;
        // a fractional value would be silently truncated, so reject it.
        if self.offline_grace.as_secs() < 3600 || self.offline_grace.as_secs() % 3600 != 0 {
            return Err(crate::TenantgateError::Config(
                "offline_grace must be a whole number of hours, at least one".to_string(),
            ));
        }
        if self.audit_retention_days <= 0 {
            return Err(crate::TenantgateError::Config(
                "audit_retention_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
