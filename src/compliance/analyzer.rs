//! Compliance analysis: typed violations and a 0-100 score.
//!
//! Pure functions over a license snapshot and usage telemetry; called
//! periodically for reporting, never on the request path. Thresholds are
//! percentages of the contractual limit, distinct per resource.

use crate::license::record::LicenseRecord;
pub use crate::audit::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User quota thresholds (warn / critical, % of limit).
pub const USER_THRESHOLDS: (f64, f64) = (80.0, 95.0);
/// Storage quota thresholds.
pub const STORAGE_THRESHOLDS: (f64, f64) = (80.0, 90.0);
/// API-call quota thresholds.
pub const API_THRESHOLDS: (f64, f64) = (85.0, 95.0);
/// License expiry warning horizon (days).
pub const EXPIRY_WARNING_DAYS: i64 = 30;
/// License expiry critical horizon (days).
pub const EXPIRY_CRITICAL_DAYS: i64 = 7;

/// Current usage telemetry for a tenant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Active users right now.
    pub current_users: u64,
    /// Storage consumed (same unit as the license limit).
    pub current_storage: u64,
    /// API calls so far this calendar month.
    pub current_api_calls_this_month: u64,
}

/// Per-module usage telemetry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleUsage {
    /// Operations performed in the period.
    pub operations: u64,
}

/// Typed violation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Users over the contractual limit.
    UserLimitExceeded,
    /// User utilization at or above the critical threshold.
    UserLimitCritical,
    /// User utilization at or above the warning threshold.
    UserLimitWarning,
    /// Storage over the limit.
    StorageLimitExceeded,
    /// Storage utilization critical.
    StorageLimitCritical,
    /// Storage utilization warning.
    StorageLimitWarning,
    /// API calls over the monthly limit.
    ApiCallLimitExceeded,
    /// API utilization critical.
    ApiCallLimitCritical,
    /// API utilization warning.
    ApiCallLimitWarning,
    /// License expiry date has passed.
    LicenseExpired,
    /// License expires within the critical horizon.
    LicenseExpiringCritical,
    /// License expires within the warning horizon.
    LicenseExpiringWarning,
    /// Module used without license coverage.
    UnauthorizedModuleUsage,
    /// More activations than the license allows.
    ActivationLimitExceeded,
}

/// A single identified violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Category.
    pub kind: ViolationKind,
    /// Severity.
    pub severity: Severity,
    /// What was observed.
    pub details: String,
    /// Consequence for the tenant.
    pub impact: String,
    /// Suggested remediation.
    pub recommendation: String,
}

/// Utilization summary included in the report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAnalysis {
    /// User utilization (% of limit; 0 when unlimited).
    pub user_utilization: f64,
    /// Storage utilization.
    pub storage_utilization: f64,
    /// API-call utilization.
    pub api_utilization: f64,
    /// Whole days until license expiry (negative once past).
    pub days_until_expiry: i64,
}

/// Qualitative compliance level derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    /// Score >= 95.
    Excellent,
    /// Score >= 85.
    Good,
    /// Score >= 70.
    Acceptable,
    /// Score >= 50.
    NeedsImprovement,
    /// Below 50.
    Poor,
}

/// On-demand compliance report for a tenant and period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    /// 0-100 score.
    pub compliance_score: u8,
    /// Level derived from the score.
    pub compliance_level: ComplianceLevel,
    /// All identified violations.
    pub violations: Vec<Violation>,
    /// Utilization summary.
    pub usage_analysis: UsageAnalysis,
}

fn utilization(usage: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        usage as f64 * 100.0 / limit as f64
    }
}

/// Evaluate one resource against its limit and thresholds.
fn check_resource(
    resource: &str,
    usage: u64,
    limit: u64,
    thresholds: (f64, f64),
    kinds: (ViolationKind, ViolationKind, ViolationKind),
) -> Option<Violation> {
    // A zero limit means the license does not cap this resource.
    if limit == 0 {
        return None;
    }

    let (warn, critical) = thresholds;
    let (exceeded, at_critical, at_warning) = kinds;
    let pct = utilization(usage, limit);

    if usage > limit {
        Some(Violation {
            kind: exceeded,
            severity: Severity::Critical,
            details: format!("{} usage {} exceeds limit {}", resource, usage, limit),
            impact: format!("tenant is operating beyond the contracted {} quota", resource),
            recommendation: format!("upgrade the plan or reduce {} usage", resource),
        })
    } else if pct >= critical {
        Some(Violation {
            kind: at_critical,
            severity: Severity::Critical,
            details: format!(
                "{} utilization {:.1}% at or above critical threshold {:.0}%",
                resource, pct, critical
            ),
            impact: format!("{} quota will be exhausted imminently", resource),
            recommendation: format!("plan a {} quota increase now", resource),
        })
    } else if pct >= warn {
        Some(Violation {
            kind: at_warning,
            severity: Severity::Warning,
            details: format!(
                "{} utilization {:.1}% at or above warning threshold {:.0}%",
                resource, pct, warn
            ),
            impact: format!("{} headroom is shrinking", resource),
            recommendation: format!("review {} growth against the contracted limit", resource),
        })
    } else {
        None
    }
}

/// Identify every violation for a tenant's current usage.
pub fn identify_violations(
    license: &LicenseRecord,
    usage: &UsageStats,
    module_usage: &BTreeMap<String, ModuleUsage>,
    activations: usize,
    max_activations: usize,
    now: DateTime<Utc>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    violations.extend(check_resource(
        "user",
        usage.current_users,
        license.features.max_users,
        USER_THRESHOLDS,
        (
            ViolationKind::UserLimitExceeded,
            ViolationKind::UserLimitCritical,
            ViolationKind::UserLimitWarning,
        ),
    ));
    violations.extend(check_resource(
        "storage",
        usage.current_storage,
        license.features.max_storage,
        STORAGE_THRESHOLDS,
        (
            ViolationKind::StorageLimitExceeded,
            ViolationKind::StorageLimitCritical,
            ViolationKind::StorageLimitWarning,
        ),
    ));
    violations.extend(check_resource(
        "api_call",
        usage.current_api_calls_this_month,
        license.features.max_api_calls_per_month,
        API_THRESHOLDS,
        (
            ViolationKind::ApiCallLimitExceeded,
            ViolationKind::ApiCallLimitCritical,
            ViolationKind::ApiCallLimitWarning,
        ),
    ));

    let days = license.days_until_expiry(now);
    if days <= 0 {
        violations.push(Violation {
            kind: ViolationKind::LicenseExpired,
            severity: Severity::Critical,
            details: format!("license expired at {}", license.expires_at.to_rfc3339()),
            impact: "all licensed modules are unusable".to_string(),
            recommendation: "renew the license immediately".to_string(),
        });
    } else if days <= EXPIRY_CRITICAL_DAYS {
        violations.push(Violation {
            kind: ViolationKind::LicenseExpiringCritical,
            severity: Severity::Critical,
            details: format!("license expires in {} days", days),
            impact: "licensed modules stop working at expiry".to_string(),
            recommendation: "renew before the expiry date".to_string(),
        });
    } else if days <= EXPIRY_WARNING_DAYS {
        violations.push(Violation {
            kind: ViolationKind::LicenseExpiringWarning,
            severity: Severity::Warning,
            details: format!("license expires in {} days", days),
            impact: "renewal window is closing".to_string(),
            recommendation: "start the renewal process".to_string(),
        });
    }

    for module in module_usage.keys() {
        if !license.covers(module) {
            violations.push(Violation {
                kind: ViolationKind::UnauthorizedModuleUsage,
                severity: Severity::Critical,
                details: format!("module '{}' used without license coverage", module),
                impact: "usage outside the contract".to_string(),
                recommendation: format!("license module '{}' or disable it", module),
            });
        }
    }

    if activations > max_activations {
        violations.push(Violation {
            kind: ViolationKind::ActivationLimitExceeded,
            severity: Severity::Critical,
            details: format!(
                "{} activations against a limit of {}",
                activations, max_activations
            ),
            impact: "more installations than the license permits".to_string(),
            recommendation: "deactivate unused installations".to_string(),
        });
    }

    violations
}

/// Derive the 0-100 compliance score.
///
/// 100 minus 20 per critical and 5 per warning violation, plus 10 for a
/// clean slate and 5 when expiry is more than 90 days out, clamped to
/// [0, 100]. Utilization above 90% is not deducted separately: it
/// already surfaces as a warning or critical violation, and deducting
/// twice would double-penalize the same condition.
pub fn compliance_score(
    violations: &[Violation],
    license: &LicenseRecord,
    now: DateTime<Utc>,
) -> u8 {
    let mut score: i64 = 100;

    for violation in violations {
        score -= match violation.severity {
            Severity::Critical => 20,
            Severity::Warning => 5,
            Severity::Error | Severity::Info => 0,
        };
    }

    if violations.is_empty() {
        score += 10;
    }
    if license.days_until_expiry(now) > 90 {
        score += 5;
    }

    score.clamp(0, 100) as u8
}

/// Map a score to its qualitative level.
pub fn compliance_level(score: u8) -> ComplianceLevel {
    match score {
        95..=100 => ComplianceLevel::Excellent,
        85..=94 => ComplianceLevel::Good,
        70..=84 => ComplianceLevel::Acceptable,
        50..=69 => ComplianceLevel::NeedsImprovement,
        _ => ComplianceLevel::Poor,
    }
}

/// Produce a full compliance report for a tenant.
pub fn report(
    license: &LicenseRecord,
    usage: &UsageStats,
    module_usage: &BTreeMap<String, ModuleUsage>,
    activations: usize,
    max_activations: usize,
    now: DateTime<Utc>,
) -> ComplianceReport {
    let violations =
        identify_violations(license, usage, module_usage, activations, max_activations, now);
    let score = compliance_score(&violations, license, now);

    ComplianceReport {
        compliance_score: score,
        compliance_level: compliance_level(score),
        violations,
        usage_analysis: UsageAnalysis {
            user_utilization: utilization(usage.current_users, license.features.max_users),
            storage_utilization: utilization(usage.current_storage, license.features.max_storage),
            api_utilization: utilization(
                usage.current_api_calls_this_month,
                license.features.max_api_calls_per_month,
            ),
            days_until_expiry: license.days_until_expiry(now),
        },
    }
}
