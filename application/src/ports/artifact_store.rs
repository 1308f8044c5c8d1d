//! Artifact store port.
//!
//! Append-only storage of task outputs. There is deliberately no update or
//! delete: corrections are new artifacts that supersede old ones by
//! reference.

use async_trait::async_trait;
use bidbridge_domain::{Artifact, ArtifactKind, DomainError, TaskId};

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists an artifact. Fails with `NotFound` when the owning task is
    /// unknown; whether a terminal task still accepts artifacts is an
    /// adapter policy choice.
    async fn put(&self, artifact: Artifact) -> Result<Artifact, DomainError>;

    /// Artifacts belonging to one task, in insertion order.
    async fn list_by_task(&self, task_id: &TaskId) -> Result<Vec<Artifact>, DomainError>;

    /// Artifacts of one kind across all tasks, in insertion order.
    async fn list_by_kind(&self, kind: ArtifactKind) -> Result<Vec<Artifact>, DomainError>;
}
