//! Core domain primitives: identifiers and error types.

pub mod error;
pub mod ids;

pub use error::DomainError;
pub use ids::{AgentId, ArtifactId, ProjectId, TaskId};
