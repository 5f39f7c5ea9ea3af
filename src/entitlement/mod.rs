//! Pure per-tenant module availability decisions.

pub mod check;

pub use check::{check_availability, entitlements, Availability, AvailabilityReason, TenantContext, TenantEntitlement};
