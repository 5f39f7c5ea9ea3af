//! Per-tenant license record lifecycle.
//!
//! The store is the only mutation path for license records: every create
//! or update re-signs the record and re-seals the at-rest copy. Consumers
//! receive `Arc<LicenseRecord>` snapshots swapped atomically under the
//! map lock, so two concurrent entitlement checks for one tenant always
//! observe a single consistent record, never a half-applied update.

use crate::audit::{AuditEvent, AuditEventType, AuditSink, Severity};
use crate::clock::Clock;
use crate::client::RemoteValidator;
use crate::config::TenantgateConfig;
use crate::crypto::seal::{seal, unseal};
use crate::license::artifact::LicenseArtifact;
use crate::license::grace::GraceState;
use crate::license::record::LicenseRecord;
use crate::license::vault::LicenseVault;
use crate::TenantgateError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// License record store with sealed at-rest copies and offline grace.
pub struct LicenseStore {
    secret: String,
    sealing_key: [u8; 32],
    key_version: u32,
    grace_hours: i64,
    vault: LicenseVault,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditSink>,
    records: RwLock<HashMap<String, Arc<LicenseRecord>>>,
    grace: RwLock<HashMap<String, GraceState>>,
}

impl LicenseStore {
    /// Create a store from config and collaborators.
    pub fn new(
        config: &TenantgateConfig,
        vault: LicenseVault,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditSink>,
    ) -> Self {
        Self {
            secret: config.license_secret.clone(),
            sealing_key: config.sealing_key,
            key_version: config.key_version,
            // Config validation guarantees a whole, non-zero hour count.
            grace_hours: (config.offline_grace.as_secs() / 3600) as i64,
            vault,
            clock,
            audit,
            records: RwLock::new(HashMap::new()),
            grace: RwLock::new(HashMap::new()),
        }
    }

    fn audit_event(
        &self,
        tenant_id: &str,
        event_type: AuditEventType,
        severity: Severity,
        details: String,
    ) {
        self.audit.append(AuditEvent {
            tenant_id: tenant_id.to_string(),
            module_key: None,
            event_type,
            severity,
            details,
            timestamp: self.clock.now_utc(),
        });
    }

    /// Sign, seal, persist, and publish a record.
    fn commit(&self, mut record: LicenseRecord) -> Result<Arc<LicenseRecord>, TenantgateError> {
        record.resign(&self.secret)?;

        let json = serde_json::to_vec(&record)
            .map_err(|e| TenantgateError::Crypto(format!("Record serialization failed: {}", e)))?;
        let blob = seal(&json, &self.sealing_key, self.key_version)?;
        record.integrity.integrity_hash = blob.integrity_hash.clone();
        record.integrity.last_integrity_check = Some(self.clock.now_utc());

        // The hash describes the sealed copy, so it stays outside the
        // sealed bytes; re-sign now that it is recorded.
        record.resign(&self.secret)?;
        self.vault.save(&record.tenant_id, &blob)?;

        let snapshot = Arc::new(record);
        let mut records = self.records.write().expect("record lock");
        records.insert(snapshot.tenant_id.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// Create a license record from a validated, signature-checked
    /// artifact.
    pub fn create(&self, artifact: &LicenseArtifact) -> Result<Arc<LicenseRecord>, TenantgateError> {
        artifact.validate_structure()?;
        artifact.verify_signature(&self.secret)?;

        let record = LicenseRecord::from_artifact(artifact, self.grace_hours, self.clock.as_ref());
        let tenant_id = record.tenant_id.clone();
        let snapshot = self.commit(record)?;

        self.grace
            .write()
            .expect("grace lock")
            .insert(tenant_id.clone(), GraceState::OnlineValid);

        tracing::info!(tenant = %tenant_id, license = %snapshot.license_number, "license created");
        self.audit_event(
            &tenant_id,
            AuditEventType::LicenseCreated,
            Severity::Info,
            format!("license {} installed", snapshot.license_number),
        );
        Ok(snapshot)
    }

    /// Update a tenant's record through a closure; re-signs and re-seals.
    pub fn update<F>(&self, tenant_id: &str, mutate: F) -> Result<Arc<LicenseRecord>, TenantgateError>
    where
        F: FnOnce(&mut LicenseRecord),
    {
        let current = self
            .snapshot(tenant_id)
            .ok_or_else(|| TenantgateError::MissingLicense(tenant_id.to_string()))?;

        let mut record = (*current).clone();
        mutate(&mut record);
        let snapshot = self.commit(record)?;

        self.audit_event(
            tenant_id,
            AuditEventType::LicenseUpdated,
            Severity::Info,
            format!("license {} updated", snapshot.license_number),
        );
        Ok(snapshot)
    }

    /// Current immutable snapshot for a tenant.
    pub fn snapshot(&self, tenant_id: &str) -> Option<Arc<LicenseRecord>> {
        self.records
            .read()
            .expect("record lock")
            .get(tenant_id)
            .cloned()
    }

    /// Current grace state for a tenant.
    pub fn grace_state(&self, tenant_id: &str) -> GraceState {
        self.grace
            .read()
            .expect("grace lock")
            .get(tenant_id)
            .copied()
            .unwrap_or(GraceState::OnlineValid)
    }

    fn set_grace_state(&self, tenant_id: &str, state: GraceState) {
        self.grace
            .write()
            .expect("grace lock")
            .insert(tenant_id.to_string(), state);
    }

    /// Load and verify the sealed at-rest copy for a tenant.
    ///
    /// Recomputes the integrity hash, decrypts, and verifies the record
    /// signature. Any failure marks the in-memory record as tampered and
    /// rejects the copy; a tampered copy is never silently accepted.
    pub fn load_cached(&self, tenant_id: &str) -> Result<LicenseRecord, TenantgateError> {
        let blob = self
            .vault
            .load(tenant_id)?
            .ok_or_else(|| TenantgateError::MissingLicense(tenant_id.to_string()))?;

        let verified = unseal(&blob, &self.sealing_key)
            .and_then(|json| {
                serde_json::from_slice::<LicenseRecord>(&json)
                    .map_err(|_| TenantgateError::Tampered)
            })
            .and_then(|record| {
                record.verify_signature(&self.secret)?;
                Ok(record)
            });

        match verified {
            Ok(record) => Ok(record),
            Err(err) => {
                tracing::warn!(tenant = %tenant_id, error = %err, "sealed license copy rejected");
                self.mark_tampered(tenant_id);
                self.audit_event(
                    tenant_id,
                    AuditEventType::ValidationFailed,
                    Severity::Critical,
                    "sealed license copy failed integrity verification".to_string(),
                );
                Err(TenantgateError::Tampered)
            }
        }
    }

    fn mark_tampered(&self, tenant_id: &str) {
        let Some(current) = self.snapshot(tenant_id) else {
            return;
        };
        let mut record = (*current).clone();
        record.integrity.tamper_detection = true;
        record.integrity.last_integrity_check = Some(self.clock.now_utc());
        // Publish without re-sealing: the vault copy is the evidence.
        if record.resign(&self.secret).is_ok() {
            let mut records = self.records.write().expect("record lock");
            records.insert(tenant_id.to_string(), Arc::new(record));
        }
    }

    /// Validate a tenant's license, online first with offline fallback.
    ///
    /// Online success restores `ONLINE_VALID`; an authoritative remote
    /// rejection is final. Transport failure enters (or continues) the
    /// offline grace window and validates the sealed cached copy; past
    /// the deadline every attempt is denied with `OfflineGraceExpired`.
    /// Every attempt and transition is audited.
    pub fn validate(
        &self,
        tenant_id: &str,
        validator: &dyn RemoteValidator,
        machine_id: &str,
    ) -> Result<Arc<LicenseRecord>, TenantgateError> {
        let record = self.snapshot(tenant_id).ok_or_else(|| {
            self.audit_event(
                tenant_id,
                AuditEventType::ValidationFailed,
                Severity::Error,
                "no license on file".to_string(),
            );
            TenantgateError::MissingLicense(tenant_id.to_string())
        })?;

        let now = self.clock.now_utc();
        if now >= record.expires_at {
            self.audit_event(
                tenant_id,
                AuditEventType::LicenseExpired,
                Severity::Critical,
                format!("license expired at {}", record.expires_at.to_rfc3339()),
            );
            return Err(TenantgateError::LicenseExpired {
                expired_at: record.expires_at.to_rfc3339(),
            });
        }

        match validator.validate(&record.license_number, machine_id) {
            Ok(true) => {
                let state = self.grace_state(tenant_id).reconnect(true);
                self.set_grace_state(tenant_id, state);
                self.audit_event(
                    tenant_id,
                    AuditEventType::ValidationSucceeded,
                    Severity::Info,
                    "remote validation confirmed".to_string(),
                );
                if record.offline.grace_deadline.is_some() {
                    return self.update(tenant_id, |r| r.offline.grace_deadline = None);
                }
                Ok(record)
            }
            Ok(false) => {
                self.audit_event(
                    tenant_id,
                    AuditEventType::ValidationFailed,
                    Severity::Critical,
                    "remote validation rejected the license".to_string(),
                );
                Err(TenantgateError::InvalidLicense)
            }
            Err(transport) => self.validate_offline(tenant_id, &record, transport),
        }
    }

    /// Offline fallback against the sealed cached copy.
    fn validate_offline(
        &self,
        tenant_id: &str,
        record: &Arc<LicenseRecord>,
        transport: TenantgateError,
    ) -> Result<Arc<LicenseRecord>, TenantgateError> {
        if !record.offline.enabled {
            self.audit_event(
                tenant_id,
                AuditEventType::ValidationFailed,
                Severity::Error,
                "offline operation disabled for this license".to_string(),
            );
            return Err(transport);
        }

        let now = self.clock.now_utc();
        let previous = self.grace_state(tenant_id);
        let state = previous.lose_connectivity(now, record.offline.grace_hours);

        if previous != state {
            if let GraceState::OfflineGrace { deadline } = state {
                self.audit_event(
                    tenant_id,
                    AuditEventType::ValidationFailed,
                    Severity::Warning,
                    format!(
                        "connectivity lost, offline grace until {}",
                        deadline.to_rfc3339()
                    ),
                );
                self.update(tenant_id, |r| r.offline.grace_deadline = Some(deadline))?;
            }
        }

        let (next, outcome) = state.validate_offline(now);
        self.set_grace_state(tenant_id, next);

        match outcome {
            Ok(()) => {
                // The cached sealed copy still has to pass signature and
                // tamper checks before the grace window counts.
                let cached = self.load_cached(tenant_id)?;
                self.audit_event(
                    tenant_id,
                    AuditEventType::ValidationSucceeded,
                    Severity::Info,
                    format!("validated offline via cached license {}", cached.license_number),
                );
                self.snapshot(tenant_id)
                    .ok_or_else(|| TenantgateError::MissingLicense(tenant_id.to_string()))
            }
            Err(err) => {
                self.audit_event(
                    tenant_id,
                    AuditEventType::ValidationFailed,
                    Severity::Critical,
                    "offline grace deadline passed, validation denied".to_string(),
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditQuery;
    use crate::clock::MockClock;
    use crate::client::remote::test_fixtures::ScriptedValidator;
    use crate::config::QuotaPolicy;
    use crate::license::artifact::test_fixtures::{signed_artifact, SECRET};
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    struct Harness {
        store: LicenseStore,
        clock: Arc<MockClock>,
        audit: Arc<AuditSink>,
        _dir: TempDir,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(MockClock::from_rfc3339("2026-06-01T00:00:00Z"));
        let audit = Arc::new(AuditSink::new(365));
        let config = TenantgateConfig {
            license_secret: SECRET.to_string(),
            sealing_key: [11u8; 32],
            key_version: 1,
            vault_namespace: "unused-in-tests".to_string(),
            offline_grace: StdDuration::from_secs(72 * 3600),
            audit_retention_days: 365,
            quota_policy: QuotaPolicy::Advisory,
        };
        let vault = LicenseVault::with_path(dir.path().to_path_buf()).unwrap();
        let store = LicenseStore::new(&config, vault, clock.clone(), audit.clone());
        Harness {
            store,
            clock,
            audit,
            _dir: dir,
        }
    }

    #[test]
    fn create_signs_and_publishes_snapshot() {
        let h = harness();
        let record = h.store.create(&signed_artifact(&["hr-core", "payroll"])).unwrap();
        record.verify_signature(SECRET).unwrap();
        assert!(!record.integrity.integrity_hash.is_empty());

        let snapshot = h.store.snapshot("tenant-1").unwrap();
        assert_eq!(snapshot.license_number, record.license_number);
        assert_eq!(h.store.grace_state("tenant-1"), GraceState::OnlineValid);
    }

    #[test]
    fn create_rejects_forged_artifact() {
        let h = harness();
        let mut artifact = signed_artifact(&["hr-core"]);
        artifact.company_name = "Forged Corp".to_string();
        assert!(matches!(
            h.store.create(&artifact),
            Err(TenantgateError::SignatureMismatch)
        ));
    }

    #[test]
    fn update_resigns_and_reseals() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();

        let updated = h
            .store
            .update("tenant-1", |r| r.features.max_users = 500)
            .unwrap();
        updated.verify_signature(SECRET).unwrap();
        assert_eq!(updated.features.max_users, 500);

        // The sealed copy reflects the update.
        let cached = h.store.load_cached("tenant-1").unwrap();
        assert_eq!(cached.features.max_users, 500);
    }

    #[test]
    fn load_cached_detects_vault_tampering() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();

        // Flip a ciphertext byte in the stored blob.
        let mut blob = h.store.vault.load("tenant-1").unwrap().unwrap();
        let mut bytes = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            &blob.ciphertext,
        )
        .unwrap();
        bytes[0] ^= 0x01;
        blob.ciphertext =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes);
        h.store.vault.save("tenant-1", &blob).unwrap();

        assert!(matches!(
            h.store.load_cached("tenant-1"),
            Err(TenantgateError::Tampered)
        ));

        // In-memory record is flagged and now invalid.
        let snapshot = h.store.snapshot("tenant-1").unwrap();
        assert!(snapshot.integrity.tamper_detection);
        assert!(!snapshot.is_valid(h.clock.now_utc()));

        // The rejection was audited at critical severity.
        let critical = h.audit.query(&AuditQuery {
            severity: Some(Severity::Critical),
            ..AuditQuery::default()
        });
        assert!(!critical.is_empty());
    }

    #[test]
    fn online_validation_confirms_and_audits() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();

        let validator = ScriptedValidator::valid();
        let record = h.store.validate("tenant-1", &validator, "machine-1").unwrap();
        assert!(record.is_valid(h.clock.now_utc()));
        assert_eq!(h.store.grace_state("tenant-1"), GraceState::OnlineValid);

        let succeeded = h.audit.query(&AuditQuery {
            event_type: Some(AuditEventType::ValidationSucceeded),
            ..AuditQuery::default()
        });
        assert_eq!(succeeded.len(), 1);
    }

    #[test]
    fn remote_rejection_is_final() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();

        let validator = ScriptedValidator::invalid();
        assert!(matches!(
            h.store.validate("tenant-1", &validator, "machine-1"),
            Err(TenantgateError::InvalidLicense)
        ));
    }

    #[test]
    fn transport_failure_enters_grace_and_validates_cached_copy() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();

        let validator = ScriptedValidator::unreachable();
        let record = h.store.validate("tenant-1", &validator, "machine-1").unwrap();
        assert!(record.offline.grace_deadline.is_some());
        assert!(matches!(
            h.store.grace_state("tenant-1"),
            GraceState::OfflineGrace { .. }
        ));
    }

    #[test]
    fn grace_deadline_boundary() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();
        let validator = ScriptedValidator::unreachable();

        // Enter grace at T0; window is 72h.
        h.store.validate("tenant-1", &validator, "machine-1").unwrap();

        // One second before the deadline: still validates from cache.
        h.clock
            .advance(chrono::Duration::hours(72) - chrono::Duration::seconds(1));
        assert!(h.store.validate("tenant-1", &validator, "machine-1").is_ok());

        // Two seconds later (one past the deadline): hard deny.
        h.clock.advance(chrono::Duration::seconds(2));
        assert!(matches!(
            h.store.validate("tenant-1", &validator, "machine-1"),
            Err(TenantgateError::OfflineGraceExpired)
        ));
        assert_eq!(h.store.grace_state("tenant-1"), GraceState::ExpiredOffline);
    }

    #[test]
    fn reconnect_after_expiry_restores_online() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();
        let outage = ScriptedValidator::unreachable();

        h.store.validate("tenant-1", &outage, "machine-1").unwrap();
        h.clock.advance(chrono::Duration::hours(73));
        let _ = h.store.validate("tenant-1", &outage, "machine-1");
        assert_eq!(h.store.grace_state("tenant-1"), GraceState::ExpiredOffline);

        let recovered = ScriptedValidator::valid();
        let record = h.store.validate("tenant-1", &recovered, "machine-1").unwrap();
        assert_eq!(h.store.grace_state("tenant-1"), GraceState::OnlineValid);
        assert!(record.offline.grace_deadline.is_none());
    }

    #[test]
    fn expired_license_denied_before_remote_call() {
        let h = harness();
        h.store.create(&signed_artifact(&["hr-core"])).unwrap();
        h.clock.set("2027-01-01T00:00:01Z".parse().unwrap());

        let validator = ScriptedValidator::valid();
        assert!(matches!(
            h.store.validate("tenant-1", &validator, "machine-1"),
            Err(TenantgateError::LicenseExpired { .. })
        ));
        assert_eq!(
            validator.calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[test]
    fn missing_tenant_is_reported() {
        let h = harness();
        let validator = ScriptedValidator::valid();
        assert!(matches!(
            h.store.validate("ghost", &validator, "machine-1"),
            Err(TenantgateError::MissingLicense(_))
        ));
    }
}
