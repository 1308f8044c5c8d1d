//! Task registry port.
//!
//! Defines how the application layer persists and queries tasks.
//! Implementations (adapters) live in the infrastructure layer; the
//! concurrency contract below is what the dispatcher relies on.

use async_trait::async_trait;
use bidbridge_domain::{DomainError, Task, TaskFilter, TaskId, TaskStatus};

/// Persistence contract for the task registry.
///
/// # Concurrency contract
///
/// `transition` must be atomic per task: concurrent callers race on a
/// compare-and-set over the current status, exactly one reaches a terminal
/// state, and losers receive `Conflict`. Transitions on *different* tasks
/// never serialize against each other.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task in `Pending`.
    ///
    /// Idempotent: a retried create with an identical payload returns the
    /// stored task (which may already have progressed). A create whose id
    /// exists with a *different* payload fails with `Conflict`.
    async fn create(&self, task: Task) -> Result<Task, DomainError>;

    /// Applies one state-machine transition and returns the updated task.
    ///
    /// `NotFound` for an unknown id; `Conflict` when the current status is
    /// terminal or `status` is not a legal successor.
    async fn transition(
        &self,
        id: &TaskId,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<Task, DomainError>;

    /// Fetches one task by id.
    async fn get(&self, id: &TaskId) -> Result<Task, DomainError>;

    /// Returns all tasks matching the filter, ordered by creation time
    /// ascending. A snapshot: restarting the query re-reads current state.
    async fn query(&self, filter: TaskFilter) -> Result<Vec<Task>, DomainError>;
}
