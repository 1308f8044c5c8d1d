//! Task entity and lifecycle state machine.
//!
//! A [`Task`] is one unit of work assigned from one agent to another.
//! Its [`TaskStatus`] moves monotonically through a small state machine:
//!
//! ```text
//! Pending ──> InProgress ──> Completed
//!        │              └──> Failed
//!        │              └──> Cancelled
//!        └──> Failed
//!        └──> Cancelled
//! ```
//!
//! Terminal states are final — the registry enforces this with a
//! compare-and-set, so the first caller to reach a terminal state wins and
//! concurrent racers observe a conflict.

use super::value_objects::TaskAttributes;
use crate::core::ids::{AgentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting to be picked up by its assignee
    #[default]
    Pending,
    /// Task is currently being executed
    InProgress,
    /// Task completed successfully
    Completed,
    /// Task failed
    Failed,
    /// Task was cancelled before completion
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Whether this status is final. Terminal tasks never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `next` is a legal successor of this status.
    ///
    /// `Pending` may move to `InProgress`, or straight to `Failed` /
    /// `Cancelled` (a task can be abandoned before work starts).
    /// `InProgress` may only move to a terminal state. Terminal states
    /// have no successors, and no state may re-enter itself.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match self {
            TaskStatus::Pending => matches!(
                next,
                TaskStatus::InProgress | TaskStatus::Failed | TaskStatus::Cancelled
            ),
            TaskStatus::InProgress => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked unit of work with a bounded lifecycle and a single assignee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Externally-visible identifier, assigned by the creator agent
    pub id: TaskId,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Agent that created the task
    pub creator: AgentId,
    /// Agent responsible for executing the task
    pub assignee: AgentId,
    /// Optional parent task (sub-task linkage)
    pub parent: Option<TaskId>,
    /// Free-form result payload, recorded on completion
    pub result: Option<serde_json::Value>,
    /// Error description, recorded on failure
    pub error: Option<String>,
    /// Domain-specific extension fields, validated at the boundary
    pub attributes: TaskAttributes,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
    /// Set when the task enters a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new task in `Pending`.
    pub fn new(id: impl Into<TaskId>, creator: impl Into<AgentId>, assignee: impl Into<AgentId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            creator: creator.into(),
            assignee: assignee.into(),
            parent: None,
            result: None,
            error: None,
            attributes: TaskAttributes::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<TaskId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_attributes(mut self, attributes: TaskAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Whether a retried create carries the same payload as this task.
    ///
    /// Creation is idempotent: a duplicate create with an identical payload
    /// returns the stored task, while a differing payload is a conflict.
    /// Status, result, and timestamps are deliberately excluded — the
    /// original may already have progressed when the retry arrives.
    pub fn same_creation(&self, other: &Task) -> bool {
        self.id == other.id
            && self.creator == other.creator
            && self.assignee == other.assignee
            && self.parent == other.parent
            && self.attributes == other.attributes
    }

    /// Applies a legal transition, recording result / error and stamping
    /// `completed_at` when entering a terminal state.
    ///
    /// This is the single mutation point for task state; stores call it
    /// while holding their own lock so the check-and-apply is atomic.
    pub fn apply_transition(
        &mut self,
        next: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<(), crate::core::DomainError> {
        use crate::core::DomainError;

        if self.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "task '{}' is already {} and cannot transition to {}",
                self.id, self.status, next
            )));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::Conflict(format!(
                "illegal transition {} -> {} for task '{}'",
                self.status, next, self.id
            )));
        }

        self.status = next;
        if let Some(result) = result {
            self.result = Some(result);
        }
        if let Some(error) = error {
            self.error = Some(error);
        }
        let now = Utc::now();
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> Task {
        Task::new("task-1", "homeowner-agent", "bid-card-agent")
    }

    // ==================== State machine ====================

    #[test]
    fn pending_to_in_progress_is_legal() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn pending_can_be_cancelled_or_failed_directly() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Cancelled));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn pending_cannot_complete_directly() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn in_progress_only_moves_to_terminal() {
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for terminal in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            for next in [
                TaskStatus::Pending,
                TaskStatus::InProgress,
                TaskStatus::Completed,
                TaskStatus::Failed,
                TaskStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    // ==================== Transitions ====================

    #[test]
    fn completing_records_result_and_timestamp() {
        let mut t = task();
        t.apply_transition(TaskStatus::InProgress, None, None).unwrap();
        t.apply_transition(TaskStatus::Completed, Some(json!({"bids": 3})), None)
            .unwrap();

        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.result, Some(json!({"bids": 3})));
        assert!(t.completed_at.is_some());
    }

    #[test]
    fn transition_after_terminal_is_conflict_and_leaves_state_unchanged() {
        let mut t = task();
        t.apply_transition(TaskStatus::Cancelled, None, None).unwrap();
        let before = t.clone();

        let err = t
            .apply_transition(TaskStatus::InProgress, None, None)
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(t.status, before.status);
        assert_eq!(t.updated_at, before.updated_at);
    }

    #[test]
    fn failing_records_error() {
        let mut t = task();
        t.apply_transition(TaskStatus::Failed, None, Some("no contractors found".into()))
            .unwrap();
        assert_eq!(t.error.as_deref(), Some("no contractors found"));
        assert!(t.completed_at.is_some());
    }

    // ==================== Idempotent creation ====================

    #[test]
    fn same_creation_ignores_progress() {
        let original = task();
        let mut progressed = original.clone();
        progressed
            .apply_transition(TaskStatus::InProgress, None, None)
            .unwrap();

        let retry = Task::new("task-1", "homeowner-agent", "bid-card-agent");
        assert!(progressed.same_creation(&retry));
        assert!(original.same_creation(&retry));
    }

    #[test]
    fn same_creation_rejects_differing_assignee() {
        let a = task();
        let b = Task::new("task-1", "homeowner-agent", "matching-agent");
        assert!(!a.same_creation(&b));
    }
}
