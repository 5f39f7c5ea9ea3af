//! Tenantgate error types.

use thiserror::Error;

/// Errors that can occur in the license and entitlement engine.
#[derive(Debug, Error)]
pub enum TenantgateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// License artifact is structurally malformed (rejected before any
    /// signature check).
    #[error("License structure invalid: {0}")]
    Structure(String),

    /// License signature does not match the recomputed value (tamper or
    /// forgery).
    #[error("License signature mismatch")]
    SignatureMismatch,

    /// License expiry date is in the past.
    #[error("License expired at {expired_at}")]
    LicenseExpired {
        /// The expiry timestamp that has passed.
        expired_at: String,
    },

    /// The module dependency graph contains a cycle (fatal at registry
    /// load).
    #[error("Circular module dependency: {}", cycle.join(" -> "))]
    CircularDependency {
        /// The module keys forming the cycle, in walk order.
        cycle: Vec<String>,
    },

    /// Module activation rejected because required dependencies are not
    /// enabled.
    #[error("Module '{module}' missing required dependencies: {}", missing.join(", "))]
    MissingDependency {
        /// The module whose activation was rejected.
        module: String,
        /// The dependency keys that are not enabled.
        missing: Vec<String>,
    },

    /// Module used or activated without license coverage.
    #[error("Module '{module}' is not covered by the license")]
    UnauthorizedModule {
        /// The uncovered module key.
        module: String,
    },

    /// The offline grace deadline has passed; all validation is denied.
    #[error("Offline grace period expired")]
    OfflineGraceExpired,

    /// Module key is not present in the registry.
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// Stored license copy failed an integrity or authenticity check.
    #[error("License record tampering detected")]
    Tampered,

    /// Transport error contacting the remote validation service.
    #[error("License service transport error: {0}")]
    Transport(String),

    /// Vault I/O error reading or writing the sealed license copy.
    #[error("Vault I/O error: {0}")]
    VaultIO(String),

    /// Cryptographic operation failed (sealing, unsealing, key setup).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// No license is on file for the tenant.
    #[error("No license on file for tenant '{0}'")]
    MissingLicense(String),

    /// License exists but is not valid (revoked, inactive, or rejected by
    /// the remote service).
    #[error("Invalid license")]
    InvalidLicense,

    /// A contractual quota was exceeded and the configured policy is
    /// enforcing.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
}
