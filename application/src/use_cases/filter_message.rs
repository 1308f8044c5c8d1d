//! Filter Message use case.
//!
//! Runs one raw message through the compliance filter and, when delivery is
//! allowed, persists the *delivered* form as a message artifact of the
//! owning task. Raw text is held only for the duration of this call; the
//! stored artifact and the audit trail are the only records that remain.

use crate::ports::artifact_store::ArtifactStore;
use crate::ports::audit_log::{AuditEvent, ComplianceAuditLog};
use crate::ports::agent_endpoint::AgentRouter;
use crate::ports::connection_gate::ConnectionGate;
use bidbridge_domain::{
    AgentId, Artifact, ArtifactPayload, ComplianceFilter, DomainError, FilterOutcome,
    ParticipantRole, ProjectId, RecipientContext, TaskId,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One message to evaluate and (possibly) persist.
#[derive(Debug, Clone)]
pub struct FilterMessageInput {
    /// Task the message belongs to (message artifacts hang off tasks).
    pub task: TaskId,
    pub project: ProjectId,
    pub sender: AgentId,
    pub recipient: AgentId,
    /// Raw text as submitted by the sender.
    pub raw: String,
}

/// Use case wiring the pure filter to the gate, the artifact store, and the
/// audit log.
pub struct FilterMessageUseCase<G: ConnectionGate, A: ArtifactStore> {
    gate: Arc<G>,
    artifacts: Arc<A>,
    router: Arc<AgentRouter>,
    audit: Arc<dyn ComplianceAuditLog>,
    filter: ComplianceFilter,
}

impl<G: ConnectionGate, A: ArtifactStore> FilterMessageUseCase<G, A> {
    pub fn new(
        gate: Arc<G>,
        artifacts: Arc<A>,
        router: Arc<AgentRouter>,
        audit: Arc<dyn ComplianceAuditLog>,
        filter: ComplianceFilter,
    ) -> Self {
        Self {
            gate,
            artifacts,
            router,
            audit,
            filter,
        }
    }

    /// Evaluates the message and stores the delivered artifact.
    ///
    /// Returns `ComplianceViolation` when the filter rejects; nothing is
    /// persisted or delivered in that case, but the violation is audited.
    pub async fn execute(&self, input: FilterMessageInput) -> Result<Artifact, DomainError> {
        let sender_role = self.router.role(&input.sender);
        let recipient_role = self.router.role(&input.recipient);
        let paid = self.paid_for_pair(&input, sender_role, recipient_role).await?;

        let ctx = RecipientContext {
            project: input.project.clone(),
            recipient: input.recipient.clone(),
            sender_role,
            recipient_role,
            paid,
        };
        debug!(
            task = %input.task,
            sender = %input.sender,
            recipient = %input.recipient,
            paid,
            "filtering message"
        );

        match self.filter.filter(&input.raw, &input.sender, &ctx) {
            FilterOutcome::Rejected { reason } => {
                warn!(
                    task = %input.task,
                    sender = %input.sender,
                    %reason,
                    "message rejected by compliance filter"
                );
                self.audit.record(AuditEvent::ComplianceViolation {
                    project: input.project.clone(),
                    task: input.task.clone(),
                    sender: input.sender.clone(),
                    recipient: input.recipient.clone(),
                    reason: reason.clone(),
                    at: Utc::now(),
                });
                Err(DomainError::ComplianceViolation { reason })
            }
            FilterOutcome::Delivered { text, redactions } => {
                if !redactions.is_empty() {
                    info!(
                        task = %input.task,
                        count = redactions.len(),
                        "structured identifiers redacted"
                    );
                    self.audit.record(AuditEvent::MessageRedacted {
                        project: input.project.clone(),
                        task: input.task.clone(),
                        sender: input.sender.clone(),
                        recipient: input.recipient.clone(),
                        redactions: redactions.clone(),
                        at: Utc::now(),
                    });
                }

                let mut artifact = Artifact::new(
                    input.task.clone(),
                    input.sender.clone(),
                    ArtifactPayload::Message {
                        project: input.project.clone(),
                        recipient: input.recipient.clone(),
                        delivered: text,
                        redactions,
                    },
                );
                // The pseudonymous label is stored with the message so
                // recipients can display it instead of the raw sender id.
                if let Some(alias) = self.router.alias(&input.sender) {
                    artifact
                        .attributes
                        .insert("sender_alias".into(), alias.into());
                }
                self.artifacts.put(artifact).await
            }
        }
    }

    /// The gate keys on (project, contractor); work out which side of the
    /// pair is the contractor. Pairs without a contractor side (system
    /// traffic) have no paid state to consult.
    async fn paid_for_pair(
        &self,
        input: &FilterMessageInput,
        sender_role: ParticipantRole,
        recipient_role: ParticipantRole,
    ) -> Result<bool, DomainError> {
        let contractor = if sender_role == ParticipantRole::Contractor {
            &input.sender
        } else if recipient_role == ParticipantRole::Contractor {
            &input.recipient
        } else {
            return Ok(false);
        };
        self.gate.is_paid(&input.project, contractor).await
    }
}
