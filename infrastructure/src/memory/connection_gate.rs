//! In-memory connection gate.
//!
//! Keyed by (project, contractor). Insertion order per project is kept so
//! broadcast fan-out visits contractors in the order their relationships
//! were recorded.

use async_trait::async_trait;
use bidbridge_application::ports::connection_gate::ConnectionGate;
use bidbridge_application::ports::audit_log::{AuditEvent, ComplianceAuditLog, NoAuditLog};
use bidbridge_domain::{AgentId, BidStatus, ConnectionState, DomainError, ProjectId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

fn pair_key(project: &ProjectId, contractor: &AgentId) -> String {
    format!("{}/{}", project, contractor)
}

/// Mutex-guarded map implementation of the connection gate.
pub struct InMemoryConnectionGate {
    inner: Mutex<Inner>,
    audit: Arc<dyn ComplianceAuditLog>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<String, ConnectionState>,
    /// Contractors per project, in relationship-recording order.
    by_project: HashMap<ProjectId, Vec<AgentId>>,
}

impl InMemoryConnectionGate {
    pub fn new() -> Self {
        Self::with_audit(Arc::new(NoAuditLog))
    }

    /// Paid activations are compliance-relevant, so the gate shares the
    /// audit sink with the message filter.
    pub fn with_audit(audit: Arc<dyn ComplianceAuditLog>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            audit,
        }
    }
}

impl Default for InMemoryConnectionGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionGate for InMemoryConnectionGate {
    async fn is_paid(
        &self,
        project: &ProjectId,
        contractor: &AgentId,
    ) -> Result<bool, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .connections
            .get(&pair_key(project, contractor))
            .map(|c| c.paid)
            .unwrap_or(false))
    }

    async fn mark_paid(
        &self,
        project: &ProjectId,
        contractor: &AgentId,
    ) -> Result<ConnectionState, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let key = pair_key(project, contractor);
        // Payment cannot precede a relationship; an unrecorded pair is a
        // caller-side ordering conflict, not a missing entity.
        let connection = inner.connections.get_mut(&key).ok_or_else(|| {
            DomainError::Conflict(format!("connection '{key}' was never recorded"))
        })?;

        let newly_paid = !connection.paid;
        connection.mark_paid();
        let connection = connection.clone();
        drop(inner);

        if newly_paid {
            info!(project = %project, contractor = %contractor, "connection paid");
            self.audit.record(AuditEvent::ConnectionPaid {
                project: project.clone(),
                contractor: contractor.clone(),
                at: connection.activated_at.unwrap_or_else(chrono::Utc::now),
            });
        }
        Ok(connection)
    }

    async fn record_relationship(
        &self,
        project: &ProjectId,
        contractor: &AgentId,
        bid: BidStatus,
    ) -> Result<ConnectionState, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let key = pair_key(project, contractor);
        if let Some(existing) = inner.connections.get_mut(&key) {
            // Bid standing can move (pending -> accepted); paid state and
            // ordering are untouched.
            existing.bid = bid;
            return Ok(existing.clone());
        }

        let connection = ConnectionState::new(project.clone(), contractor.clone(), bid);
        inner.connections.insert(key, connection.clone());
        inner
            .by_project
            .entry(project.clone())
            .or_default()
            .push(contractor.clone());
        Ok(connection)
    }

    async fn contractors_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<AgentId>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.by_project.get(project).cloned().unwrap_or_default())
    }
}
