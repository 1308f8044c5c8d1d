//! Configuration loading and raw TOML types

mod file_config;
mod loader;

pub use file_config::{
    FileAgentEntry, FileAuditConfig, FileComplianceConfig, FileConfig, FileOrchestrationConfig,
    FileRetryConfig, FileRoutingConfig,
};
pub use loader::ConfigLoader;
