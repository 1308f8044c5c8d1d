//! Application layer for bidbridge
//!
//! This crate contains use cases, port definitions, and the delivery retry
//! policy. It depends only on the domain layer.

pub mod ports;
pub mod retry;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    agent_endpoint::{AgentBinding, AgentEndpoint, AgentRouter, DeliveryAck, EndpointError},
    artifact_store::ArtifactStore,
    audit_log::{AuditEvent, ComplianceAuditLog, NoAuditLog},
    connection_gate::ConnectionGate,
    task_store::TaskStore,
};
pub use retry::RetryPolicy;
pub use use_cases::dispatch_envelope::{DispatchEnvelopeUseCase, DispatchError, DispatchOutcome};
pub use use_cases::filter_message::{FilterMessageInput, FilterMessageUseCase};
