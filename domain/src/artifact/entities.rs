//! Artifact entity - immutable outputs produced while executing a task.
//!
//! The payload is a tagged union keyed by artifact kind rather than an
//! opaque blob, so each kind's required fields are checked when the envelope
//! is parsed and carried as real types afterwards. Corrections never mutate
//! an artifact; they create a new one that `supersedes` the old by reference.

use crate::compliance::RedactionEvent;
use crate::core::ids::{AgentId, ArtifactId, ProjectId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind tag of an artifact, derived from its payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Document,
    Image,
    Generated,
    Message,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &str {
        match self {
            ArtifactKind::Document => "document",
            ArtifactKind::Image => "image",
            ArtifactKind::Generated => "generated",
            ArtifactKind::Message => "message",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a stored artifact — one variant per kind.
///
/// `Message` carries *delivered* content only: the raw text a sender
/// submitted is filtered first and never persisted, so redactions survive
/// in the record while the original spans do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactPayload {
    /// A document held inline or by storage reference.
    Document {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    /// An image, always by storage reference.
    Image { reference: String },
    /// Agent-generated structured content (bid cards, match lists, ...).
    Generated { content: serde_json::Value },
    /// One delivered exchange unit within a project thread.
    Message {
        project: ProjectId,
        recipient: AgentId,
        /// Filter output — what the recipient actually sees.
        delivered: String,
        /// Redactions applied on the way in (empty for paid pairs).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        redactions: Vec<RedactionEvent>,
    },
}

impl ArtifactPayload {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactPayload::Document { .. } => ArtifactKind::Document,
            ArtifactPayload::Image { .. } => ArtifactKind::Image,
            ArtifactPayload::Generated { .. } => ArtifactKind::Generated,
            ArtifactPayload::Message { .. } => ArtifactKind::Message,
        }
    }

    /// Shape check applied at the system boundary.
    pub fn validate(&self) -> Result<(), crate::core::DomainError> {
        use crate::core::DomainError;
        match self {
            ArtifactPayload::Document { content, reference } => {
                if content.is_none() && reference.is_none() {
                    return Err(DomainError::Validation(
                        "document artifact needs inline content or a storage reference".into(),
                    ));
                }
            }
            ArtifactPayload::Image { reference } => {
                if reference.is_empty() {
                    return Err(DomainError::Validation(
                        "image artifact needs a storage reference".into(),
                    ));
                }
            }
            ArtifactPayload::Generated { .. } => {}
            ArtifactPayload::Message {
                delivered,
                recipient,
                ..
            } => {
                if delivered.is_empty() {
                    return Err(DomainError::Validation("message body is empty".into()));
                }
                if recipient.is_empty() {
                    return Err(DomainError::Validation("message recipient is empty".into()));
                }
            }
        }
        Ok(())
    }
}

/// An immutable output produced in the course of executing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Store-assigned identity
    pub id: ArtifactId,
    /// Owning task — must exist when the artifact is created
    pub task_id: TaskId,
    /// Agent that produced the artifact
    pub producer: AgentId,
    /// Kind-tagged payload
    pub payload: ArtifactPayload,
    /// Domain-specific extension fields
    pub attributes: HashMap<String, serde_json::Value>,
    /// Artifact this one corrects, if any
    pub supersedes: Option<ArtifactId>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(task_id: impl Into<TaskId>, producer: impl Into<AgentId>, payload: ArtifactPayload) -> Self {
        Self {
            id: ArtifactId::generate(),
            task_id: task_id.into(),
            producer: producer.into(),
            payload,
            attributes: HashMap::new(),
            supersedes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, serde_json::Value>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn superseding(mut self, old: ArtifactId) -> Self {
        self.supersedes = Some(old);
        self
    }

    pub fn kind(&self) -> ArtifactKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_payload() {
        let a = Artifact::new(
            "task-1",
            "bid-card-agent",
            ArtifactPayload::Generated {
                content: serde_json::json!({"budget": 1500}),
            },
        );
        assert_eq!(a.kind(), ArtifactKind::Generated);
    }

    #[test]
    fn document_without_content_or_reference_is_invalid() {
        let payload = ArtifactPayload::Document {
            content: None,
            reference: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn document_with_reference_is_valid() {
        let payload = ArtifactPayload::Document {
            content: None,
            reference: Some("storage://quotes/q-17.pdf".into()),
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn message_payload_requires_body_and_recipient() {
        let payload = ArtifactPayload::Message {
            project: "project-1".into(),
            recipient: "".into(),
            delivered: "hello".into(),
            redactions: Vec::new(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn supersession_links_by_reference() {
        let old = Artifact::new(
            "task-1",
            "bid-card-agent",
            ArtifactPayload::Generated {
                content: serde_json::json!({"budget": 1500}),
            },
        );
        let new = Artifact::new(
            "task-1",
            "bid-card-agent",
            ArtifactPayload::Generated {
                content: serde_json::json!({"budget": 1800}),
            },
        )
        .superseding(old.id.clone());

        assert_eq!(new.supersedes.as_ref(), Some(&old.id));
        assert_ne!(new.id, old.id);
    }

    #[test]
    fn payload_serde_round_trip_keeps_kind_tag() {
        let payload = ArtifactPayload::Image {
            reference: "storage://photos/p-3.jpg".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "image");
        let back: ArtifactPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }
}
