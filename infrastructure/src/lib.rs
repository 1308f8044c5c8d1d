//! Infrastructure layer for bidbridge
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
#[cfg(feature = "http-transport")]
pub mod http;
pub mod logging;
pub mod memory;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileAgentEntry, FileAuditConfig, FileComplianceConfig, FileConfig,
    FileOrchestrationConfig, FileRetryConfig, FileRoutingConfig,
};
#[cfg(feature = "http-transport")]
pub use http::HttpAgentEndpoint;
pub use logging::JsonlAuditLog;
pub use memory::{
    InMemoryArtifactStore, InMemoryAuditLog, InMemoryConnectionGate, InMemoryTaskStore,
    InProcessEndpoint,
};
