//! Domain layer for bidbridge
//!
//! This crate contains the core business logic, entities, and value objects
//! of the marketplace coordination core. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Task orchestration
//!
//! Agents coordinate by exchanging [`Envelope`]s that create, update,
//! cancel, or attach outputs to [`Task`]s. Task status moves monotonically
//! through a small state machine with final terminal states; the registry
//! guarantees exactly one racer wins the transition into a terminal state.
//!
//! ## Compliance filtering
//!
//! Every message between a homeowner and a contractor passes through the
//! [`ComplianceFilter`] before delivery. Paid pairs communicate freely;
//! unpaid pairs get structured identifiers redacted, and indirect
//! circumvention attempts are rejected outright (fail closed).

pub mod artifact;
pub mod compliance;
pub mod connection;
pub mod core;
pub mod envelope;
pub mod task;
pub mod util;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactKind, ArtifactPayload};
pub use compliance::{
    CircumventionSignal, ComplianceFilter, CompliancePolicy, FilterOutcome, RecipientContext,
    RedactionCategory, RedactionEvent, ViolationReason,
};
pub use connection::{BidStatus, ConnectionState, ParticipantRole};
pub use core::{AgentId, ArtifactId, DomainError, ProjectId, TaskId};
pub use envelope::{ArtifactDraft, DraftPayload, Envelope, EnvelopeKind};
pub use task::{EscalationPolicy, Task, TaskAttributes, TaskFilter, TaskStatus};
