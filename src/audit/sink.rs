//! Append-only audit sink.
//!
//! Every component writes lifecycle events here. Appends are serialized
//! through a mutex; queries copy matching events out under the same lock
//! and release it before the caller sees them. Retention purges events
//! older than the configured horizon except critical ones, which are
//! retained indefinitely.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Event severity, shared with compliance violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Should be looked at.
    Warning,
    /// Operation failed.
    Error,
    /// Security- or contract-relevant failure.
    Critical,
}

/// Fixed enumeration of auditable event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A license validation attempt succeeded.
    ValidationSucceeded,
    /// A license validation attempt failed.
    ValidationFailed,
    /// License reached its expiry date.
    LicenseExpired,
    /// License is approaching its expiry date.
    LicenseExpiring,
    /// A quota crossed its warning threshold.
    LimitWarning,
    /// A quota was exceeded.
    LimitExceeded,
    /// A module was activated for a tenant.
    ModuleActivated,
    /// A module was deactivated for a tenant.
    ModuleDeactivated,
    /// A license record was created.
    LicenseCreated,
    /// A license record was updated.
    LicenseUpdated,
    /// A subscription changed tier or scope.
    SubscriptionChanged,
    /// A trial started.
    TrialStarted,
    /// A trial ended.
    TrialEnded,
    /// Usage telemetry was recorded.
    UsageTracked,
    /// A module activation violated its dependency contract.
    DependencyViolation,
}

/// Immutable audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Tenant the event concerns.
    pub tenant_id: String,
    /// Module key, when the event is module-scoped.
    pub module_key: Option<String>,
    /// Event type.
    pub event_type: AuditEventType,
    /// Severity.
    pub severity: Severity,
    /// Free-form context (reason, counts, deadlines).
    pub details: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

/// Filter and pagination for audit queries.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Restrict to one tenant.
    pub tenant_id: Option<String>,
    /// Restrict to one module.
    pub module_key: Option<String>,
    /// Restrict to one event type.
    pub event_type: Option<AuditEventType>,
    /// Restrict to one severity.
    pub severity: Option<Severity>,
    /// Inclusive lower timestamp bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub end: Option<DateTime<Utc>>,
    /// Maximum events to return (`None` = no limit).
    pub limit: Option<usize>,
    /// Events to skip before collecting (for pagination).
    pub skip: usize,
}

impl AuditQuery {
    /// Query scoped to a tenant.
    pub fn for_tenant(tenant_id: &str) -> Self {
        Self {
            tenant_id: Some(tenant_id.to_string()),
            ..Self::default()
        }
    }

    fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(ref tenant) = self.tenant_id {
            if &event.tenant_id != tenant {
                return false;
            }
        }
        if let Some(ref module) = self.module_key {
            if event.module_key.as_deref() != Some(module.as_str()) {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if event.severity != severity {
                return false;
            }
        }
        if let Some(start) = self.start {
            if event.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if event.timestamp > end {
                return false;
            }
        }
        true
    }
}

/// Append-only audit event store.
pub struct AuditSink {
    events: Mutex<Vec<AuditEvent>>,
    retention_days: i64,
}

impl AuditSink {
    /// Create a sink with the given retention horizon.
    pub fn new(retention_days: i64) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            retention_days,
        }
    }

    /// Append an event. Safe under concurrent writers.
    pub fn append(&self, event: AuditEvent) {
        tracing::debug!(
            tenant = %event.tenant_id,
            event_type = ?event.event_type,
            severity = ?event.severity,
            "audit event"
        );
        let mut events = self.events.lock().expect("audit lock");
        events.push(event);
    }

    /// Query events, newest first, with pagination.
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEvent> {
        let events = self.events.lock().expect("audit lock");
        let mut matched: Vec<AuditEvent> = events
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        drop(events);

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Purge events older than the retention horizon.
    ///
    /// Critical events are never purged. Returns the number removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let horizon = now - Duration::days(self.retention_days);
        let mut events = self.events.lock().expect("audit lock");
        let before = events.len();
        events.retain(|e| e.severity == Severity::Critical || e.timestamp >= horizon);
        before - events.len()
    }

    /// Total events currently held.
    pub fn len(&self) -> usize {
        self.events.lock().expect("audit lock").len()
    }

    /// Whether the sink holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
