//! Entitlement checks: "can tenant X use module Y right now, and why".
//!
//! `check_availability` is a pure function of the registry, the tenant
//! configuration, and the license snapshot. No hidden state, no I/O;
//! safe to call from any number of concurrent request handlers as long
//! as the inputs are the immutable values they are designed to be.

use crate::license::record::LicenseRecord;
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant configuration relevant to entitlement decisions.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    /// Tenant identifier.
    pub tenant_id: String,
    /// Modules the tenant has switched on.
    pub enabled_modules: Vec<String>,
    /// Modules the tenant has actually exercised (from usage telemetry).
    pub used_modules: Vec<String>,
}

/// Why a module is or is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityReason {
    /// Core module, always on.
    CoreModule,
    /// Key not present in the registry.
    ModuleNotFound,
    /// Not switched on in the tenant configuration.
    ModuleDisabled,
    /// No usable license (absent, expired, revoked, or tampered).
    LicenseInvalid,
    /// License does not cover this module.
    FeatureNotLicensed,
    /// Available.
    Available,
}

/// Availability decision with its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    /// Whether the tenant may use the module.
    pub available: bool,
    /// Machine-readable reason.
    pub reason: AvailabilityReason,
    /// Human-readable context.
    pub details: Option<String>,
}

impl Availability {
    fn yes(reason: AvailabilityReason) -> Self {
        Self {
            available: true,
            reason,
            details: None,
        }
    }

    fn no(reason: AvailabilityReason, details: String) -> Self {
        Self {
            available: false,
            reason,
            details: Some(details),
        }
    }
}

/// Resolved entitlement picture for a tenant.
#[derive(Debug, Clone)]
pub struct TenantEntitlement {
    /// Always-on core modules.
    pub core_modules: Vec<String>,
    /// Modules the tenant can use right now.
    pub available_modules: Vec<String>,
    /// Modules the tenant cannot use, with the reason.
    pub unavailable_modules: Vec<(String, AvailabilityReason)>,
    /// Modules the tenant exercises without authorization.
    pub unauthorized_usage: Vec<String>,
}

/// Decide whether one module is available to a tenant.
///
/// Decision order: registry membership, core status, tenant switch,
/// license validity, license coverage.
pub fn check_availability(
    registry: &Registry,
    tenant: &TenantContext,
    license: Option<&LicenseRecord>,
    module_key: &str,
    now: DateTime<Utc>,
) -> Availability {
    let Some(config) = registry.get(module_key) else {
        return Availability::no(
            AvailabilityReason::ModuleNotFound,
            format!("module '{}' is not in the catalog", module_key),
        );
    };

    if config.is_core() {
        return Availability::yes(AvailabilityReason::CoreModule);
    }

    if !tenant.enabled_modules.iter().any(|m| m == module_key) {
        return Availability::no(
            AvailabilityReason::ModuleDisabled,
            format!("module '{}' is not enabled for this tenant", module_key),
        );
    }

    let Some(license) = license.filter(|l| l.is_valid(now)) else {
        return Availability::no(
            AvailabilityReason::LicenseInvalid,
            "no valid license on file".to_string(),
        );
    };

    if !license.covers(module_key) {
        return Availability::no(
            AvailabilityReason::FeatureNotLicensed,
            format!("license {} does not cover '{}'", license.license_number, module_key),
        );
    }

    Availability::yes(AvailabilityReason::Available)
}

/// Partition every registry module for a tenant and surface unauthorized
/// usage.
pub fn entitlements(
    registry: &Registry,
    tenant: &TenantContext,
    license: Option<&LicenseRecord>,
    now: DateTime<Utc>,
) -> TenantEntitlement {
    let mut available = Vec::new();
    let mut unavailable = Vec::new();

    for key in registry.keys() {
        let decision = check_availability(registry, tenant, license, key, now);
        if decision.available {
            available.push(key.to_string());
        } else {
            unavailable.push((key.to_string(), decision.reason));
        }
    }

    let unauthorized = tenant
        .used_modules
        .iter()
        .filter(|key| {
            !check_availability(registry, tenant, license, key, now).available
        })
        .cloned()
        .collect();

    TenantEntitlement {
        core_modules: registry.core_keys(),
        available_modules: available,
        unavailable_modules: unavailable,
        unauthorized_usage: unauthorized,
    }
}
