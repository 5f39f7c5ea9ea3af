//! Usage-versus-quota analysis and compliance scoring.

pub mod analyzer;

pub use analyzer::{
    compliance_level, compliance_score, identify_violations, report, ComplianceLevel,
    ComplianceReport, ModuleUsage, Severity, UsageAnalysis, UsageStats, Violation, ViolationKind,
};
