//! A2A envelopes - the unit of communication between agents.
//!
//! An envelope describes a task creation, a status update, an artifact
//! attachment, a cancellation, or a project-wide message broadcast. The
//! payload is a serde-tagged union keyed by the envelope type, so boundary
//! validation is the combination of parsing and the shape checks in
//! [`Envelope::validate`] — inside the core every field is typed.
//!
//! Artifact attachments carry a [`DraftPayload`], not a stored
//! [`ArtifactPayload`](crate::artifact::ArtifactPayload): a message draft
//! holds the sender's *raw* text, which only ever reaches storage after the
//! compliance filter has turned it into delivered text plus redactions.

use crate::artifact::ArtifactPayload;
use crate::core::DomainError;
use crate::core::ids::{AgentId, ArtifactId, ProjectId, TaskId};
use crate::task::{TaskAttributes, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Payload of a not-yet-stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftPayload {
    Document {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    Image { reference: String },
    Generated { content: serde_json::Value },
    /// Raw message text, pre-filter. Never persisted as-is.
    Message {
        project: ProjectId,
        recipient: AgentId,
        body: String,
    },
}

impl DraftPayload {
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            DraftPayload::Document { content, reference } => {
                if content.is_none() && reference.is_none() {
                    return Err(DomainError::Validation(
                        "document artifact needs inline content or a storage reference".into(),
                    ));
                }
            }
            DraftPayload::Image { reference } => {
                if reference.is_empty() {
                    return Err(DomainError::Validation(
                        "image artifact needs a storage reference".into(),
                    ));
                }
            }
            DraftPayload::Generated { .. } => {}
            DraftPayload::Message {
                body, recipient, ..
            } => {
                if body.is_empty() {
                    return Err(DomainError::Validation("message body is empty".into()));
                }
                if recipient.is_empty() {
                    return Err(DomainError::Validation("message recipient is empty".into()));
                }
            }
        }
        Ok(())
    }

    /// Converts a non-message draft into its stored form.
    ///
    /// Message drafts have no direct stored form — they pass through the
    /// compliance filter first — so they come back unchanged in `Err`.
    pub fn into_stored(self) -> Result<ArtifactPayload, DraftPayload> {
        match self {
            DraftPayload::Document { content, reference } => {
                Ok(ArtifactPayload::Document { content, reference })
            }
            DraftPayload::Image { reference } => Ok(ArtifactPayload::Image { reference }),
            DraftPayload::Generated { content } => Ok(ArtifactPayload::Generated { content }),
            draft @ DraftPayload::Message { .. } => Err(draft),
        }
    }
}

/// A not-yet-stored artifact carried on an attach envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDraft {
    pub payload: DraftPayload,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<ArtifactId>,
}

impl ArtifactDraft {
    pub fn new(payload: DraftPayload) -> Self {
        Self {
            payload,
            attributes: HashMap::new(),
            supersedes: None,
        }
    }
}

/// What the envelope asks the coordinator to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Register a new task in `Pending`.
    Create {
        #[serde(default)]
        attributes: TaskAttributes,
    },
    /// Move an existing task through its state machine.
    Update {
        status: TaskStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Attach an output to an existing task.
    AttachArtifact { draft: ArtifactDraft },
    /// Cancel an in-flight task.
    Cancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Fan one message out to every contractor related to a project.
    Broadcast { project: ProjectId, body: String },
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &str {
        match self {
            EnvelopeKind::Create { .. } => "create",
            EnvelopeKind::Update { .. } => "update",
            EnvelopeKind::AttachArtifact { .. } => "attach_artifact",
            EnvelopeKind::Cancel { .. } => "cancel",
            EnvelopeKind::Broadcast { .. } => "broadcast",
        }
    }
}

/// The unit of communication between agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub task_id: TaskId,
    pub creator: AgentId,
    pub assignee: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TaskId>,
    #[serde(flatten)]
    pub kind: EnvelopeKind,
}

impl Envelope {
    pub fn new(
        task_id: impl Into<TaskId>,
        creator: impl Into<AgentId>,
        assignee: impl Into<AgentId>,
        kind: EnvelopeKind,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            creator: creator.into(),
            assignee: assignee.into(),
            parent: None,
            kind,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<TaskId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Shape validation applied before any state changes. A failure here is
    /// a `Validation` error — the envelope is rejected outright, never
    /// persisted.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.task_id.is_empty() {
            return Err(DomainError::Validation("envelope is missing a task id".into()));
        }
        if self.creator.is_empty() {
            return Err(DomainError::Validation("envelope is missing a creator".into()));
        }
        if self.assignee.is_empty() {
            return Err(DomainError::Validation("envelope is missing an assignee".into()));
        }

        match &self.kind {
            EnvelopeKind::Create { .. } | EnvelopeKind::Cancel { .. } => Ok(()),
            EnvelopeKind::Update { status, .. } => {
                if *status == TaskStatus::Pending {
                    return Err(DomainError::Validation(
                        "update envelope cannot target pending".into(),
                    ));
                }
                Ok(())
            }
            EnvelopeKind::AttachArtifact { draft } => draft.payload.validate(),
            EnvelopeKind::Broadcast { body, .. } => {
                if body.is_empty() {
                    return Err(DomainError::Validation("broadcast body is empty".into()));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_envelope() -> Envelope {
        Envelope::new(
            "task-1",
            "homeowner-agent-001",
            "bid-card-agent-001",
            EnvelopeKind::Create {
                attributes: TaskAttributes::new(),
            },
        )
    }

    #[test]
    fn valid_create_envelope_passes() {
        assert!(create_envelope().validate().is_ok());
    }

    #[test]
    fn missing_creator_is_a_validation_error() {
        let mut env = create_envelope();
        env.creator = "".into();
        let err = env.validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn missing_assignee_is_a_validation_error() {
        let mut env = create_envelope();
        env.assignee = "".into();
        assert!(env.validate().is_err());
    }

    #[test]
    fn update_to_pending_is_rejected() {
        let env = Envelope::new(
            "task-1",
            "a",
            "b",
            EnvelopeKind::Update {
                status: TaskStatus::Pending,
                result: None,
                error: None,
            },
        );
        assert!(env.validate().is_err());
    }

    #[test]
    fn attach_with_invalid_draft_is_rejected() {
        let env = Envelope::new(
            "task-1",
            "a",
            "b",
            EnvelopeKind::AttachArtifact {
                draft: ArtifactDraft::new(DraftPayload::Document {
                    content: None,
                    reference: None,
                }),
            },
        );
        assert!(env.validate().is_err());
    }

    #[test]
    fn kind_tag_serializes_as_snake_case_type_field() {
        let env = create_envelope();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "create");

        let attach = Envelope::new(
            "task-1",
            "a",
            "b",
            EnvelopeKind::AttachArtifact {
                draft: ArtifactDraft::new(DraftPayload::Generated {
                    content: json!({"bids": []}),
                }),
            },
        );
        let json = serde_json::to_value(&attach).unwrap();
        assert_eq!(json["type"], "attach_artifact");
        assert_eq!(json["draft"]["payload"]["kind"], "generated");
    }

    #[test]
    fn envelope_json_round_trip() {
        let env = Envelope::new(
            "task-7",
            "contractor-agent-001",
            "messaging-agent-001",
            EnvelopeKind::AttachArtifact {
                draft: ArtifactDraft::new(DraftPayload::Message {
                    project: "project-1".into(),
                    recipient: "homeowner-agent-001".into(),
                    body: "When can we talk?".into(),
                }),
            },
        )
        .with_parent("task-1");

        let json = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn message_draft_has_no_direct_stored_form() {
        let draft = DraftPayload::Message {
            project: "project-1".into(),
            recipient: "homeowner-agent-001".into(),
            body: "hi".into(),
        };
        assert!(draft.into_stored().is_err());

        let doc = DraftPayload::Document {
            content: Some("estimate".into()),
            reference: None,
        };
        assert!(doc.into_stored().is_ok());
    }
}
