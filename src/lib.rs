//! # Tenantgate
//!
//! **License and module entitlement engine for multi-tenant HR deployments.**
//!
//! Tenantgate decides, per tenant and per module, whether a feature may be
//! used right now: the module catalog declares dependencies and pricing,
//! signed license artifacts grant modules and quotas, and every decision
//! and state transition lands in an append-only audit trail.
//!
//! ## Features
//!
//! - **HMAC-SHA256 signed licenses** — artifacts and stored records are
//!   verified with constant-time comparison; any mutation invalidates them
//! - **Sealed at-rest copies** — license records are encrypted with
//!   ChaCha20-Poly1305 and bound to the sealing-key version, so both
//!   tampering and key rollback are detected
//! - **Offline grace** — when the license service is unreachable, the
//!   sealed cached copy keeps the tenant running for a bounded window,
//!   then validation fails closed
//! - **Dependency-aware activation** — the module graph is proven acyclic
//!   at load; activations are ordered and checked against enabled modules
//! - **Compliance scoring** — quota utilization, expiry horizons, and
//!   unauthorized usage roll up into typed violations and a 0-100 score
//!
//! ## Quickstart
//!
//! ```no_run
//! use tenantgate::{EntitlementEngine, HttpValidator, TenantgateConfig};
//! use tenantgate::config::QuotaPolicy;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), tenantgate::TenantgateError> {
//!     let config = TenantgateConfig {
//!         license_secret: "shared-secret-from-deployment-env".to_string(),
//!         sealing_key: [0u8; 32], // provision from your secret store
//!         key_version: 1,
//!         vault_namespace: "myapp-licenses".to_string(),
//!         offline_grace: Duration::from_secs(72 * 60 * 60),
//!         audit_retention_days: 365,
//!         quota_policy: QuotaPolicy::Advisory,
//!     };
//!
//!     let catalog_json = std::fs::read_to_string("catalog.json").expect("catalog file");
//!     let catalog: Vec<tenantgate::ModuleConfig> =
//!         serde_json::from_str(&catalog_json).expect("valid catalog");
//!     let validator = HttpValidator::new("https://licenses.example.com/validate")?;
//!     let engine = EntitlementEngine::new(config, catalog, Box::new(validator))?;
//!
//!     engine.install_artifact(&std::fs::read_to_string("license.json").unwrap())?;
//!     let decision = engine.check_module("tenant-1", "payroll");
//!     println!("payroll available: {} ({:?})", decision.available, decision.reason);
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Tenantgate protects against:
//! - **Forged or edited licenses** — signature mismatch rejects them
//! - **At-rest tampering** — sealed copies fail their integrity hash and
//!   the record is flagged, audited, and invalidated
//! - **Clock-independent grace abuse** — the grace deadline is sealed into
//!   the record, not recomputed from the outage
//!
//! It does **not** prevent binary patching: entitlement enforcement on a
//! host the tenant controls can always be bypassed by modifying the code.
//!
//! See [`TenantgateConfig`] for configuration details.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Module catalog and dependency graph
pub mod registry;

// License artifacts, records, vault, store
pub mod license;

// Remote validation client
pub mod client;

// Entitlement decisions
pub mod entitlement;

// Compliance analysis
pub mod compliance;

// Audit trail
pub mod audit;

// Engine (main public API)
pub mod engine;

// Re-exports for public API
pub use audit::{AuditEvent, AuditEventType, AuditQuery, AuditSink, Severity};
pub use client::{HttpValidator, RemoteValidator};
pub use clock::{Clock, SystemClock};
pub use compliance::{ComplianceLevel, ComplianceReport, UsageStats, Violation, ViolationKind};
pub use config::TenantgateConfig;
pub use engine::EntitlementEngine;
pub use entitlement::{Availability, AvailabilityReason, TenantEntitlement};
pub use errors::TenantgateError;
pub use license::{LicenseArtifact, LicenseRecord};
pub use registry::{ModuleConfig, Registry};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
