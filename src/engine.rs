//! Engine facade wiring the registry, license store, entitlement checks,
//! compliance analysis, and the audit sink into one entry point.
//!
//! The engine owns all mutable per-tenant state (enabled modules and
//! usage counters) behind a single lock; license records live in the
//! store and are only ever observed as `Arc` snapshots. Every state
//! transition is audited.

use crate::audit::{AuditEvent, AuditEventType, AuditQuery, AuditSink, Severity};
use crate::clock::{Clock, SystemClock};
use crate::client::RemoteValidator;
use crate::compliance::{self, ComplianceReport, ModuleUsage, UsageStats, ViolationKind};
use crate::config::{QuotaPolicy, TenantgateConfig};
use crate::entitlement::{check_availability, entitlements, Availability, TenantContext, TenantEntitlement};
use crate::license::artifact::LicenseArtifact;
use crate::license::record::LicenseRecord;
use crate::license::store::LicenseStore;
use crate::license::vault::LicenseVault;
use crate::registry::{ModuleConfig, Registry};
use crate::TenantgateError;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Mutable per-tenant engine state.
#[derive(Debug, Default, Clone)]
struct TenantState {
    enabled_modules: Vec<String>,
    module_usage: BTreeMap<String, ModuleUsage>,
}

/// License and entitlement engine for one deployment.
pub struct EntitlementEngine {
    registry: Registry,
    store: LicenseStore,
    audit: Arc<AuditSink>,
    clock: Arc<dyn Clock>,
    validator: Box<dyn RemoteValidator>,
    quota_policy: QuotaPolicy,
    tenants: RwLock<HashMap<String, TenantState>>,
}

impl EntitlementEngine {
    /// Build an engine with the system clock and the configured vault
    /// namespace.
    ///
    /// # Errors
    /// * `Config` - configuration fails validation
    /// * `Structure` / `CircularDependency` - the module catalog is invalid
    /// * `VaultIO` - the vault directory cannot be created
    pub fn new(
        config: TenantgateConfig,
        modules: Vec<ModuleConfig>,
        validator: Box<dyn RemoteValidator>,
    ) -> Result<Self, TenantgateError> {
        config.validate()?;
        let vault = LicenseVault::new(&config.vault_namespace)?;
        Self::with_collaborators(config, modules, validator, Arc::new(SystemClock), vault)
    }

    /// Build an engine with injected clock and vault.
    pub fn with_collaborators(
        config: TenantgateConfig,
        modules: Vec<ModuleConfig>,
        validator: Box<dyn RemoteValidator>,
        clock: Arc<dyn Clock>,
        vault: LicenseVault,
    ) -> Result<Self, TenantgateError> {
        config.validate()?;
        let registry = Registry::load(modules)?;
        let audit = Arc::new(AuditSink::new(config.audit_retention_days));
        let store = LicenseStore::new(&config, vault, clock.clone(), audit.clone());

        Ok(Self {
            registry,
            store,
            audit,
            clock,
            validator,
            quota_policy: config.quota_policy,
            tenants: RwLock::new(HashMap::new()),
        })
    }

    fn audit_event(
        &self,
        tenant_id: &str,
        module_key: Option<&str>,
        event_type: AuditEventType,
        severity: Severity,
        details: String,
    ) {
        self.audit.append(AuditEvent {
            tenant_id: tenant_id.to_string(),
            module_key: module_key.map(String::from),
            event_type,
            severity,
            details,
            timestamp: self.clock.now_utc(),
        });
    }

    /// Snapshot the entitlement context for a tenant.
    fn context(&self, tenant_id: &str) -> TenantContext {
        let tenants = self.tenants.read().expect("tenant lock");
        let state = tenants.get(tenant_id).cloned().unwrap_or_default();
        TenantContext {
            tenant_id: tenant_id.to_string(),
            enabled_modules: state.enabled_modules,
            used_modules: state.module_usage.keys().cloned().collect(),
        }
    }

    /// The module registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The audit sink.
    pub fn audit(&self) -> &AuditSink {
        &self.audit
    }

    /// Parse, verify, and install a license artifact for its tenant.
    pub fn install_artifact(&self, json: &str) -> Result<Arc<LicenseRecord>, TenantgateError> {
        let artifact = LicenseArtifact::from_json(json)?;
        let record = self.store.create(&artifact)?;
        self.tenants
            .write()
            .expect("tenant lock")
            .entry(record.tenant_id.clone())
            .or_default();
        Ok(record)
    }

    /// Current license snapshot for a tenant, if any.
    pub fn license(&self, tenant_id: &str) -> Option<Arc<LicenseRecord>> {
        self.store.snapshot(tenant_id)
    }

    /// Decide whether a tenant can use a module right now.
    pub fn check_module(&self, tenant_id: &str, module_key: &str) -> Availability {
        let ctx = self.context(tenant_id);
        let license = self.store.snapshot(tenant_id);
        check_availability(
            &self.registry,
            &ctx,
            license.as_deref(),
            module_key,
            self.clock.now_utc(),
        )
    }

    /// Full entitlement picture for a tenant.
    pub fn entitlements(&self, tenant_id: &str) -> TenantEntitlement {
        let ctx = self.context(tenant_id);
        let license = self.store.snapshot(tenant_id);
        entitlements(&self.registry, &ctx, license.as_deref(), self.clock.now_utc())
    }

    /// Dependency-ordered activation plan for a set of modules.
    pub fn activation_plan(&self, requested: &[&str]) -> Result<Vec<String>, TenantgateError> {
        self.registry.resolver().activation_order(requested)
    }

    /// Activate a module for a tenant.
    ///
    /// Required dependencies must already be enabled and the license must
    /// cover the module (core modules need no coverage). Activating an
    /// already-enabled module is a no-op.
    ///
    /// # Errors
    /// * `UnknownModule` - key not in the catalog
    /// * `MissingDependency` - required dependencies not enabled
    /// * `UnauthorizedModule` - no valid license coverage
    pub fn activate_module(&self, tenant_id: &str, module_key: &str) -> Result<(), TenantgateError> {
        if !self.registry.contains(module_key) {
            return Err(TenantgateError::UnknownModule(module_key.to_string()));
        }

        let ctx = self.context(tenant_id);
        let check = self
            .registry
            .resolver()
            .validate_activation(module_key, &ctx.enabled_modules);
        if !check.valid {
            self.audit_event(
                tenant_id,
                Some(module_key),
                AuditEventType::DependencyViolation,
                Severity::Error,
                format!(
                    "activation rejected, missing dependencies: {}",
                    check.missing_dependencies.join(", ")
                ),
            );
            return Err(TenantgateError::MissingDependency {
                module: module_key.to_string(),
                missing: check.missing_dependencies,
            });
        }

        // Evaluate availability as if the module were already switched on;
        // what remains to fail is the license gate.
        let mut candidate = ctx;
        if !candidate.enabled_modules.iter().any(|m| m == module_key) {
            candidate.enabled_modules.push(module_key.to_string());
        }
        let license = self.store.snapshot(tenant_id);
        let decision = check_availability(
            &self.registry,
            &candidate,
            license.as_deref(),
            module_key,
            self.clock.now_utc(),
        );
        if !decision.available {
            self.audit_event(
                tenant_id,
                Some(module_key),
                AuditEventType::ValidationFailed,
                Severity::Error,
                decision
                    .details
                    .unwrap_or_else(|| "activation rejected".to_string()),
            );
            return Err(TenantgateError::UnauthorizedModule {
                module: module_key.to_string(),
            });
        }

        let mut tenants = self.tenants.write().expect("tenant lock");
        let state = tenants.entry(tenant_id.to_string()).or_default();
        if !state.enabled_modules.iter().any(|m| m == module_key) {
            state.enabled_modules.push(module_key.to_string());
            drop(tenants);
            tracing::info!(tenant = %tenant_id, module = %module_key, "module activated");
            self.audit_event(
                tenant_id,
                Some(module_key),
                AuditEventType::ModuleActivated,
                Severity::Info,
                "module activated".to_string(),
            );
        }
        Ok(())
    }

    /// Deactivate a module for a tenant.
    ///
    /// Rejected while another enabled module still requires it.
    /// Deactivating a module that is not enabled is a no-op.
    pub fn deactivate_module(
        &self,
        tenant_id: &str,
        module_key: &str,
    ) -> Result<(), TenantgateError> {
        if !self.registry.contains(module_key) {
            return Err(TenantgateError::UnknownModule(module_key.to_string()));
        }

        let ctx = self.context(tenant_id);
        let dependent = ctx
            .enabled_modules
            .iter()
            .find(|m| *m != module_key && self.registry.resolver().is_dependency(m, module_key));
        if let Some(dependent) = dependent {
            self.audit_event(
                tenant_id,
                Some(module_key),
                AuditEventType::DependencyViolation,
                Severity::Error,
                format!("deactivation rejected, '{}' still requires it", dependent),
            );
            return Err(TenantgateError::MissingDependency {
                module: dependent.clone(),
                missing: vec![module_key.to_string()],
            });
        }

        let mut tenants = self.tenants.write().expect("tenant lock");
        let Some(state) = tenants.get_mut(tenant_id) else {
            return Ok(());
        };
        let before = state.enabled_modules.len();
        state.enabled_modules.retain(|m| m != module_key);
        let removed = state.enabled_modules.len() < before;
        drop(tenants);

        if removed {
            self.audit_event(
                tenant_id,
                Some(module_key),
                AuditEventType::ModuleDeactivated,
                Severity::Info,
                "module deactivated".to_string(),
            );
        }
        Ok(())
    }

    /// Record module usage telemetry for later compliance analysis.
    pub fn record_usage(&self, tenant_id: &str, module_key: &str, operations: u64) {
        let mut tenants = self.tenants.write().expect("tenant lock");
        let state = tenants.entry(tenant_id.to_string()).or_default();
        let usage = state.module_usage.entry(module_key.to_string()).or_default();
        usage.operations += operations;
        tracing::debug!(tenant = %tenant_id, module = %module_key, operations, "usage recorded");
    }

    /// Re-validate a tenant's license against the remote service, with
    /// offline-grace fallback.
    pub fn revalidate(
        &self,
        tenant_id: &str,
        machine_id: &str,
    ) -> Result<Arc<LicenseRecord>, TenantgateError> {
        self.store
            .validate(tenant_id, self.validator.as_ref(), machine_id)
    }

    /// Run a compliance analysis for a tenant and audit its findings.
    ///
    /// Under `QuotaPolicy::Enforcing` a hard quota overrun fails the call
    /// after the report and audit trail are written; under `Advisory` the
    /// report is always returned.
    pub fn compliance_report(
        &self,
        tenant_id: &str,
        usage: &UsageStats,
        activations: usize,
        max_activations: usize,
    ) -> Result<ComplianceReport, TenantgateError> {
        let license = self
            .store
            .snapshot(tenant_id)
            .ok_or_else(|| TenantgateError::MissingLicense(tenant_id.to_string()))?;

        let module_usage = {
            let tenants = self.tenants.read().expect("tenant lock");
            tenants
                .get(tenant_id)
                .map(|s| s.module_usage.clone())
                .unwrap_or_default()
        };

        let now = self.clock.now_utc();
        let report = compliance::report(
            &license,
            usage,
            &module_usage,
            activations,
            max_activations,
            now,
        );

        for violation in &report.violations {
            let event_type = match violation.kind {
                ViolationKind::LicenseExpired => AuditEventType::LicenseExpired,
                ViolationKind::LicenseExpiringCritical | ViolationKind::LicenseExpiringWarning => {
                    AuditEventType::LicenseExpiring
                }
                // Using a module without coverage is an authorization
                // failure, not a quota overrun.
                ViolationKind::UnauthorizedModuleUsage => AuditEventType::ValidationFailed,
                ViolationKind::UserLimitExceeded
                | ViolationKind::StorageLimitExceeded
                | ViolationKind::ApiCallLimitExceeded
                | ViolationKind::ActivationLimitExceeded => AuditEventType::LimitExceeded,
                _ => AuditEventType::LimitWarning,
            };
            self.audit_event(
                tenant_id,
                None,
                event_type,
                violation.severity,
                violation.details.clone(),
            );
        }
        self.audit_event(
            tenant_id,
            None,
            AuditEventType::UsageTracked,
            Severity::Info,
            format!(
                "compliance score {} with {} violations",
                report.compliance_score,
                report.violations.len()
            ),
        );

        if self.quota_policy == QuotaPolicy::Enforcing {
            let overrun = report.violations.iter().find(|v| {
                matches!(
                    v.kind,
                    ViolationKind::UserLimitExceeded
                        | ViolationKind::StorageLimitExceeded
                        | ViolationKind::ApiCallLimitExceeded
                )
            });
            if let Some(violation) = overrun {
                return Err(TenantgateError::QuotaExceeded(violation.details.clone()));
            }
        }

        Ok(report)
    }

    /// Query the audit trail.
    pub fn audit_events(&self, query: &AuditQuery) -> Vec<AuditEvent> {
        self.audit.query(query)
    }

    /// Purge audit events past the retention horizon. Critical events are
    /// kept regardless of age. Returns the number removed.
    pub fn purge_audit(&self) -> usize {
        self.audit.purge_expired(self.clock.now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::client::remote::test_fixtures::ScriptedValidator;
    use crate::entitlement::AvailabilityReason;
    use crate::license::artifact::test_fixtures::{signed_artifact, SECRET};
    use crate::registry::catalog::test_fixtures::hr_catalog;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    struct Harness {
        engine: EntitlementEngine,
        clock: Arc<MockClock>,
        _dir: TempDir,
    }

    fn harness_with_policy(policy: QuotaPolicy) -> Harness {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(MockClock::from_rfc3339("2026-06-01T00:00:00Z"));
        let config = TenantgateConfig {
            license_secret: SECRET.to_string(),
            sealing_key: [9u8; 32],
            key_version: 1,
            vault_namespace: "unused-in-tests".to_string(),
            offline_grace: StdDuration::from_secs(72 * 3600),
            audit_retention_days: 365,
            quota_policy: policy,
        };
        let vault = LicenseVault::with_path(dir.path().to_path_buf()).unwrap();
        let engine = EntitlementEngine::with_collaborators(
            config,
            hr_catalog(),
            Box::new(ScriptedValidator::valid()),
            clock.clone(),
            vault,
        )
        .unwrap();
        Harness {
            engine,
            clock,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with_policy(QuotaPolicy::Advisory)
    }

    fn install(h: &Harness, modules: &[&str]) {
        let json = serde_json::to_string(&signed_artifact(modules)).unwrap();
        h.engine.install_artifact(&json).unwrap();
    }

    #[test]
    fn install_artifact_creates_license() {
        let h = harness();
        install(&h, &["hr-core", "payroll", "attendance"]);
        let license = h.engine.license("tenant-1").unwrap();
        assert!(license.covers("payroll"));
    }

    #[test]
    fn install_rejects_tampered_json() {
        let h = harness();
        let mut artifact = signed_artifact(&["hr-core"]);
        artifact.company_name = "Forged Corp".to_string();
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(matches!(
            h.engine.install_artifact(&json),
            Err(TenantgateError::SignatureMismatch)
        ));
    }

    #[test]
    fn activation_requires_dependencies_in_order() {
        let h = harness();
        install(&h, &["hr-core", "payroll", "attendance"]);

        // payroll before attendance: rejected with the concrete missing key.
        match h.engine.activate_module("tenant-1", "payroll") {
            Err(TenantgateError::MissingDependency { module, missing }) => {
                assert_eq!(module, "payroll");
                assert_eq!(missing, vec!["attendance".to_string()]);
            }
            other => panic!("expected MissingDependency, got {:?}", other.err()),
        }

        // Following the plan succeeds.
        let plan = h.engine.activation_plan(&["payroll"]).unwrap();
        assert_eq!(plan, vec!["hr-core", "attendance", "payroll"]);
        for module in &plan {
            h.engine.activate_module("tenant-1", module).unwrap();
        }
        assert!(h.engine.check_module("tenant-1", "payroll").available);
    }

    #[test]
    fn rejected_activation_is_audited() {
        let h = harness();
        install(&h, &["hr-core", "payroll"]);
        let _ = h.engine.activate_module("tenant-1", "payroll");

        let events = h.engine.audit_events(&AuditQuery {
            event_type: Some(AuditEventType::DependencyViolation),
            ..AuditQuery::default()
        });
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].module_key.as_deref(), Some("payroll"));
    }

    #[test]
    fn unlicensed_module_cannot_activate() {
        let h = harness();
        install(&h, &["hr-core"]);
        assert!(matches!(
            h.engine.activate_module("tenant-1", "clinic"),
            Err(TenantgateError::UnauthorizedModule { module }) if module == "clinic"
        ));
    }

    #[test]
    fn unknown_module_cannot_activate() {
        let h = harness();
        install(&h, &["hr-core"]);
        assert!(matches!(
            h.engine.activate_module("tenant-1", "timetravel"),
            Err(TenantgateError::UnknownModule(_))
        ));
    }

    #[test]
    fn core_module_activates_without_license() {
        let h = harness();
        // No license installed at all.
        h.engine.activate_module("ghost-tenant", "hr-core").unwrap();
        assert!(h.engine.check_module("ghost-tenant", "hr-core").available);
    }

    #[test]
    fn deactivation_blocked_while_depended_upon() {
        let h = harness();
        install(&h, &["hr-core", "payroll", "attendance"]);
        for module in ["hr-core", "attendance", "payroll"] {
            h.engine.activate_module("tenant-1", module).unwrap();
        }

        assert!(matches!(
            h.engine.deactivate_module("tenant-1", "attendance"),
            Err(TenantgateError::MissingDependency { module, .. }) if module == "payroll"
        ));

        // Removing the dependent first unblocks it.
        h.engine.deactivate_module("tenant-1", "payroll").unwrap();
        h.engine.deactivate_module("tenant-1", "attendance").unwrap();
        assert_eq!(
            h.engine.check_module("tenant-1", "attendance").reason,
            AvailabilityReason::ModuleDisabled
        );
    }

    #[test]
    fn entitlements_surface_unauthorized_usage() {
        let h = harness();
        install(&h, &["hr-core", "attendance"]);
        h.engine.activate_module("tenant-1", "attendance").unwrap();
        // clinic is exercised without ever being activatable.
        h.engine.record_usage("tenant-1", "clinic", 12);

        let resolved = h.engine.entitlements("tenant-1");
        assert!(resolved.available_modules.contains(&"attendance".to_string()));
        assert_eq!(resolved.unauthorized_usage, vec!["clinic".to_string()]);
    }

    #[test]
    fn revalidate_goes_through_store() {
        let h = harness();
        install(&h, &["hr-core"]);
        let record = h.engine.revalidate("tenant-1", "machine-1").unwrap();
        assert!(record.is_valid(h.clock.now_utc()));
    }

    #[test]
    fn compliance_report_audits_violations() {
        let h = harness();
        install(&h, &["hr-core", "attendance"]);
        h.engine.record_usage("tenant-1", "clinic", 3);

        let usage = UsageStats::default();
        let report = h.engine.compliance_report("tenant-1", &usage, 1, 5).unwrap();
        assert!(report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::UnauthorizedModuleUsage));
        assert!(report.compliance_score < 100);

        // Unauthorized usage is an authorization failure, not a quota event.
        let failed = h.engine.audit_events(&AuditQuery {
            event_type: Some(AuditEventType::ValidationFailed),
            severity: Some(Severity::Critical),
            ..AuditQuery::default()
        });
        assert_eq!(failed.len(), 1);
        assert!(failed[0].details.contains("clinic"));
        assert!(h
            .engine
            .audit_events(&AuditQuery {
                event_type: Some(AuditEventType::LimitExceeded),
                ..AuditQuery::default()
            })
            .is_empty());

        let tracked = h.engine.audit_events(&AuditQuery {
            event_type: Some(AuditEventType::UsageTracked),
            ..AuditQuery::default()
        });
        assert_eq!(tracked.len(), 1);
    }

    #[test]
    fn expiry_violations_use_their_own_event_type() {
        let h = harness();
        install(&h, &["hr-core"]);
        // Five days before expiry.
        h.clock.set("2026-12-27T00:00:00Z".parse().unwrap());

        h.engine
            .compliance_report("tenant-1", &UsageStats::default(), 1, 5)
            .unwrap();
        let expiring = h.engine.audit_events(&AuditQuery {
            event_type: Some(AuditEventType::LicenseExpiring),
            ..AuditQuery::default()
        });
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].severity, Severity::Critical);
    }

    #[test]
    fn sub_hour_grace_rejected_at_construction() {
        // A grace window under one hour must be a configuration error, not
        // a silently disabled offline policy.
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(MockClock::from_rfc3339("2026-06-01T00:00:00Z"));
        let config = TenantgateConfig {
            license_secret: SECRET.to_string(),
            sealing_key: [9u8; 32],
            key_version: 1,
            vault_namespace: "unused-in-tests".to_string(),
            offline_grace: StdDuration::from_secs(30 * 60),
            audit_retention_days: 365,
            quota_policy: QuotaPolicy::Advisory,
        };
        let vault = LicenseVault::with_path(dir.path().to_path_buf()).unwrap();
        let result = EntitlementEngine::with_collaborators(
            config,
            hr_catalog(),
            Box::new(ScriptedValidator::valid()),
            clock,
            vault,
        );
        assert!(matches!(result, Err(TenantgateError::Config(_))));
    }

    #[test]
    fn one_hour_grace_enters_offline_window() {
        // The smallest accepted window still yields a working grace path.
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(MockClock::from_rfc3339("2026-06-01T00:00:00Z"));
        let config = TenantgateConfig {
            license_secret: SECRET.to_string(),
            sealing_key: [9u8; 32],
            key_version: 1,
            vault_namespace: "unused-in-tests".to_string(),
            offline_grace: StdDuration::from_secs(3600),
            audit_retention_days: 365,
            quota_policy: QuotaPolicy::Advisory,
        };
        let vault = LicenseVault::with_path(dir.path().to_path_buf()).unwrap();
        let engine = EntitlementEngine::with_collaborators(
            config,
            hr_catalog(),
            Box::new(ScriptedValidator::unreachable()),
            clock.clone(),
            vault,
        )
        .unwrap();

        let json = serde_json::to_string(&signed_artifact(&["hr-core"])).unwrap();
        engine.install_artifact(&json).unwrap();

        let record = engine.revalidate("tenant-1", "machine-1").unwrap();
        assert!(record.offline.enabled);
        assert_eq!(record.offline.grace_hours, 1);
        assert!(record.offline.grace_deadline.is_some());

        clock.advance(chrono::Duration::hours(1) + chrono::Duration::seconds(1));
        assert!(matches!(
            engine.revalidate("tenant-1", "machine-1"),
            Err(TenantgateError::OfflineGraceExpired)
        ));
    }

    #[test]
    fn advisory_policy_reports_overruns_without_failing() {
        let h = harness();
        install(&h, &["hr-core"]);
        // Uncapped limits: seed a capped one via the store update path.
        h.engine
            .store
            .update("tenant-1", |r| r.features.max_users = 10)
            .unwrap();

        let usage = UsageStats {
            current_users: 50,
            ..UsageStats::default()
        };
        let report = h.engine.compliance_report("tenant-1", &usage, 1, 5).unwrap();
        assert!(report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::UserLimitExceeded));
    }

    #[test]
    fn enforcing_policy_fails_hard_overruns() {
        let h = harness_with_policy(QuotaPolicy::Enforcing);
        install(&h, &["hr-core"]);
        h.engine
            .store
            .update("tenant-1", |r| r.features.max_users = 10)
            .unwrap();

        let usage = UsageStats {
            current_users: 50,
            ..UsageStats::default()
        };
        assert!(matches!(
            h.engine.compliance_report("tenant-1", &usage, 1, 5),
            Err(TenantgateError::QuotaExceeded(_))
        ));
        // The overrun was still audited before the failure.
        let exceeded = h.engine.audit_events(&AuditQuery {
            event_type: Some(AuditEventType::LimitExceeded),
            ..AuditQuery::default()
        });
        assert_eq!(exceeded.len(), 1);
    }

    #[test]
    fn purge_audit_honors_retention() {
        let h = harness();
        install(&h, &["hr-core"]);
        assert!(!h.engine.audit().is_empty());

        h.clock.advance(chrono::Duration::days(400));
        let removed = h.engine.purge_audit();
        assert!(removed > 0);
    }

    #[test]
    fn expired_license_blocks_availability() {
        let h = harness();
        install(&h, &["hr-core", "attendance"]);
        h.engine.activate_module("tenant-1", "attendance").unwrap();
        assert!(h.engine.check_module("tenant-1", "attendance").available);

        h.clock.set("2027-02-01T00:00:00Z".parse().unwrap());
        let decision = h.engine.check_module("tenant-1", "attendance");
        assert!(!decision.available);
        assert_eq!(decision.reason, AvailabilityReason::LicenseInvalid);
    }
}
