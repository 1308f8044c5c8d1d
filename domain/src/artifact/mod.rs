//! Artifact domain model: append-only task outputs.

pub mod entities;

pub use entities::{Artifact, ArtifactKind, ArtifactPayload};
