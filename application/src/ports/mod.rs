//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent_endpoint;
pub mod artifact_store;
pub mod audit_log;
pub mod connection_gate;
pub mod task_store;
