//! Compliance audit log port.
//!
//! Redactions and rejections are recorded with full context for later
//! audit; the raw message text itself is only ever held transiently and
//! excerpts in the events are the sole trace of it.

use bidbridge_domain::{AgentId, ProjectId, RedactionEvent, TaskId, ViolationReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One auditable compliance decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A message was delivered with structured identifiers removed.
    MessageRedacted {
        project: ProjectId,
        task: TaskId,
        sender: AgentId,
        recipient: AgentId,
        redactions: Vec<RedactionEvent>,
        at: DateTime<Utc>,
    },
    /// A message was rejected as a circumvention attempt or role violation.
    ComplianceViolation {
        project: ProjectId,
        task: TaskId,
        sender: AgentId,
        recipient: AgentId,
        reason: ViolationReason,
        at: DateTime<Utc>,
    },
    /// A pair completed its paid introduction.
    ConnectionPaid {
        project: ProjectId,
        contractor: AgentId,
        at: DateTime<Utc>,
    },
}

/// Sink for compliance audit events.
///
/// Recording is fire-and-forget from the use cases' perspective: a failing
/// sink must not block message handling, so the trait is infallible and
/// adapters log their own write errors.
pub trait ComplianceAuditLog: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// No-op sink for setups that do not retain audit trails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuditLog;

impl ComplianceAuditLog for NoAuditLog {
    fn record(&self, _event: AuditEvent) {}
}
