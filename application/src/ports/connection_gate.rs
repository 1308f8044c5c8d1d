//! Connection gate port.
//!
//! Tracks, per (project, contractor) pair, whether a paid introduction has
//! been established. The paid flag is write-once: it never reverts, so the
//! filter can read it without coordination.

use async_trait::async_trait;
use bidbridge_domain::{AgentId, BidStatus, ConnectionState, DomainError, ProjectId};

#[async_trait]
pub trait ConnectionGate: Send + Sync {
    /// Whether the pair has completed a paid introduction. Unknown pairs
    /// are simply unpaid.
    async fn is_paid(&self, project: &ProjectId, contractor: &AgentId)
    -> Result<bool, DomainError>;

    /// Marks the pair paid on an external payment-confirmation event.
    ///
    /// Idempotent for already-paid pairs. Fails with `Conflict` when the
    /// pair was never recorded — payment cannot precede a relationship.
    async fn mark_paid(
        &self,
        project: &ProjectId,
        contractor: &AgentId,
    ) -> Result<ConnectionState, DomainError>;

    /// Records a project/contractor relationship seen by the external
    /// project store (a bid, or a first-contact intent).
    async fn record_relationship(
        &self,
        project: &ProjectId,
        contractor: &AgentId,
        bid: BidStatus,
    ) -> Result<ConnectionState, DomainError>;

    /// Contractors with a recorded relationship to the project, in the
    /// order they were recorded. Used by broadcast fan-out.
    async fn contractors_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<AgentId>, DomainError>;
}
