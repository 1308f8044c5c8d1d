//! Agent delivery port and routing table.
//!
//! Every destination — an HTTP-bound agent or an in-process test double —
//! implements the same [`AgentEndpoint`] capability. The [`AgentRouter`] is
//! an explicit structure constructed at startup from configuration and
//! passed to the dispatcher by reference; the core consults it, never
//! mutates it.

use async_trait::async_trait;
use bidbridge_domain::{AgentId, Envelope, ParticipantRole};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while delivering an envelope to an agent.
#[derive(Error, Debug, Clone)]
pub enum EndpointError {
    /// Transient: the agent did not answer in time.
    #[error("Delivery timed out")]
    Timeout,

    /// Transient: connection refused or dropped.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Permanent: the agent answered but refused the envelope.
    #[error("Envelope rejected by agent: {0}")]
    Rejected(String),

    #[error("Other delivery error: {0}")]
    Other(String),
}

impl EndpointError {
    /// Whether retrying the same delivery can possibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EndpointError::Timeout | EndpointError::Connection(_))
    }
}

/// Acknowledgment returned by an agent that accepted an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAck {
    pub agent: AgentId,
}

/// Capability every reachable agent binding implements identically.
#[async_trait]
pub trait AgentEndpoint: Send + Sync {
    async fn accept(&self, envelope: &Envelope) -> Result<DeliveryAck, EndpointError>;
}

/// One routed agent: its delivery endpoint plus marketplace metadata.
#[derive(Clone)]
pub struct AgentBinding {
    pub endpoint: Arc<dyn AgentEndpoint>,
    pub role: ParticipantRole,
    /// Pseudonymous display label shown to counterparties instead of the
    /// raw agent id (e.g. "Contractor A").
    pub alias: Option<String>,
}

/// Routing table from agent id to delivery binding.
///
/// Built once at startup; test setups substitute in-process doubles.
#[derive(Clone, Default)]
pub struct AgentRouter {
    bindings: HashMap<AgentId, AgentBinding>,
}

impl AgentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        agent: impl Into<AgentId>,
        role: ParticipantRole,
        endpoint: Arc<dyn AgentEndpoint>,
    ) -> &mut Self {
        self.bindings.insert(
            agent.into(),
            AgentBinding {
                endpoint,
                role,
                alias: None,
            },
        );
        self
    }

    pub fn register_with_alias(
        &mut self,
        agent: impl Into<AgentId>,
        role: ParticipantRole,
        alias: impl Into<String>,
        endpoint: Arc<dyn AgentEndpoint>,
    ) -> &mut Self {
        self.bindings.insert(
            agent.into(),
            AgentBinding {
                endpoint,
                role,
                alias: Some(alias.into()),
            },
        );
        self
    }

    pub fn binding(&self, agent: &AgentId) -> Option<&AgentBinding> {
        self.bindings.get(agent)
    }

    pub fn endpoint(&self, agent: &AgentId) -> Option<Arc<dyn AgentEndpoint>> {
        self.bindings.get(agent).map(|b| Arc::clone(&b.endpoint))
    }

    /// Role of an agent; unknown agents default to `System` so internal
    /// plumbing does not trip the human-pair role rules.
    pub fn role(&self, agent: &AgentId) -> ParticipantRole {
        self.bindings
            .get(agent)
            .map(|b| b.role)
            .unwrap_or(ParticipantRole::System)
    }

    pub fn alias(&self, agent: &AgentId) -> Option<&str> {
        self.bindings.get(agent).and_then(|b| b.alias.as_deref())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for AgentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRouter")
            .field("agents", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}
