//! Append-only audit log for license and module lifecycle events.

pub mod sink;

pub use sink::{AuditEvent, AuditEventType, AuditQuery, AuditSink, Severity};
