//! In-memory adapters
//!
//! Single-process implementations of the application ports. These are the
//! default adapters for local deployments and the substrate for tests.

pub mod artifact_store;
pub mod audit_log;
pub mod connection_gate;
pub mod endpoint;
pub mod task_store;

pub use artifact_store::InMemoryArtifactStore;
pub use audit_log::InMemoryAuditLog;
pub use connection_gate::InMemoryConnectionGate;
pub use endpoint::InProcessEndpoint;
pub use task_store::InMemoryTaskStore;
