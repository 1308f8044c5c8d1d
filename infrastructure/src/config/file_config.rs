//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain / application
//! types where appropriate.

use bidbridge_application::RetryPolicy;
use bidbridge_domain::{CompliancePolicy, EscalationPolicy, ParticipantRole};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Delivery retry settings
    pub retry: FileRetryConfig,
    /// Compliance filter settings
    pub compliance: FileComplianceConfig,
    /// Task orchestration settings
    pub orchestration: FileOrchestrationConfig,
    /// Audit trail settings
    pub audit: FileAuditConfig,
    /// Agent routing table
    pub routing: FileRoutingConfig,
}

/// `[retry]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff multiplier between consecutive retries.
    pub multiplier: f64,
    /// Total attempt ceiling, including the initial try.
    pub max_attempts: u32,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base_delay_ms: policy.base_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            max_attempts: policy.max_attempts,
        }
    }
}

impl FileRetryConfig {
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_attempts: self.max_attempts.max(1),
        }
    }
}

/// `[compliance]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileComplianceConfig {
    /// Risk score at or above which an unpaid message is rejected.
    pub risk_threshold: u32,
}

impl Default for FileComplianceConfig {
    fn default() -> Self {
        Self {
            risk_threshold: CompliancePolicy::default().risk_threshold,
        }
    }
}

impl FileComplianceConfig {
    pub fn to_compliance_policy(&self) -> CompliancePolicy {
        CompliancePolicy {
            risk_threshold: self.risk_threshold,
        }
    }
}

/// `[orchestration]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestrationConfig {
    /// Parent escalation on child failure: "none" or "fail_parent".
    pub escalation: String,
    /// Whether artifacts may still be attached after the owning task
    /// reached a terminal state.
    pub accept_artifacts_after_terminal: bool,
}

impl Default for FileOrchestrationConfig {
    fn default() -> Self {
        Self {
            escalation: "none".to_string(),
            accept_artifacts_after_terminal: true,
        }
    }
}

impl FileOrchestrationConfig {
    /// Parses the escalation policy; unknown values fall back to `None`
    /// with a warning left to the caller via the returned flag.
    pub fn parse_escalation(&self) -> (EscalationPolicy, bool) {
        match self.escalation.to_lowercase().as_str() {
            "none" | "" => (EscalationPolicy::None, true),
            "fail_parent" | "fail-parent" => (EscalationPolicy::FailParent, true),
            _ => (EscalationPolicy::None, false),
        }
    }
}

/// `[audit]` section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuditConfig {
    /// JSONL audit trail path. Absent means no on-disk trail.
    pub path: Option<PathBuf>,
}

/// `[routing]` section with its `[[routing.agents]]` entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoutingConfig {
    pub agents: Vec<FileAgentEntry>,
}

/// One routed agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentEntry {
    /// Agent id, e.g. "contractor-agent-001".
    pub id: String,
    /// Marketplace role: "homeowner", "contractor", or "system".
    pub role: String,
    /// Pseudonymous display label shown to counterparties.
    pub alias: Option<String>,
    /// Delivery URL for the HTTP transport. Absent means in-process.
    pub url: Option<String>,
}

impl Default for FileAgentEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            role: "system".to_string(),
            alias: None,
            url: None,
        }
    }
}

impl FileAgentEntry {
    /// Parses the role; unknown values fall back to `System` with a flag
    /// for the caller to warn on.
    pub fn parse_role(&self) -> (ParticipantRole, bool) {
        match self.role.to_lowercase().as_str() {
            "homeowner" => (ParticipantRole::Homeowner, true),
            "contractor" => (ParticipantRole::Contractor, true),
            "system" | "" => (ParticipantRole::System, true),
            _ => (ParticipantRole::System, false),
        }
    }
}
