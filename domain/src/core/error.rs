//! Domain error types
//!
//! One enum covers the error kinds the coordination core surfaces to
//! callers. Every failure is definitive: callers receive either the
//! resulting entity or one of these variants with enough detail (entity,
//! id, reason) to decide whether to retry, escalate, or abandon.

use crate::compliance::ViolationReason;
use crate::core::ids::AgentId;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Malformed envelope or missing required field. Rejected before any
    /// state change; never persisted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Reference to an unknown task, artifact, or connection pair.
    #[error("{entity} not found: '{id}'")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Duplicate creation or an illegal / already-resolved state transition.
    /// Callers must not blindly retry in the same direction.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Message rejected by the compliance filter. The message was never
    /// delivered, not even partially.
    #[error("Compliance violation: {reason}")]
    ComplianceViolation { reason: ViolationReason },

    /// Destination agent unreachable after the retry budget was exhausted.
    /// The owning task has already been moved to Failed when this surfaces.
    #[error("Agent '{agent}' unreachable after {attempts} attempts: {message}")]
    DownstreamUnavailable {
        agent: AgentId,
        attempts: u32,
        message: String,
    },
}

impl DomainError {
    /// Shorthand for a NotFound over a task id.
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Task",
            id: id.into(),
        }
    }

    /// Whether this error is a conflict (informational for racing callers).
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_includes_entity_and_id() {
        let e = DomainError::task_not_found("task-9");
        assert_eq!(e.to_string(), "Task not found: 'task-9'");
    }

    #[test]
    fn conflict_check() {
        assert!(DomainError::Conflict("dup".into()).is_conflict());
        assert!(!DomainError::Validation("x".into()).is_conflict());
    }
}
