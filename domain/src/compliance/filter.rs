//! The compliance filter - pure evaluation of one message.
//!
//! Given the raw text, the sender, and the recipient context (which carries
//! the connection gate's paid flag), the filter produces exactly one of:
//!
//! - **pass-through**: the pair completed a paid introduction, text goes out
//!   verbatim with zero redaction events;
//! - **redacted delivery**: unpaid pair, structured identifiers replaced by
//!   category placeholders, each replacement recorded;
//! - **rejection**: unpaid pair and the circumvention risk score crosses the
//!   threshold — nothing is delivered and the sender gets a reason.
//!
//! The filter never silently drops a message: a rejection always carries a
//! [`ViolationReason`] for the sender.

use super::heuristics;
use super::patterns::{self, RedactionEvent};
use crate::connection::ParticipantRole;
use crate::core::ids::{AgentId, ProjectId};
use serde::{Deserialize, Serialize};

/// Tunable filter policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompliancePolicy {
    /// Risk score at or above which an unpaid message is rejected.
    ///
    /// The default (40) sits below every individual heuristic weight, so a
    /// single indicator is sufficient — the filter fails closed.
    pub risk_threshold: u32,
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self { risk_threshold: 40 }
    }
}

/// Everything the filter needs to know about where a message is going.
#[derive(Debug, Clone)]
pub struct RecipientContext {
    pub project: ProjectId,
    pub recipient: AgentId,
    pub sender_role: ParticipantRole,
    pub recipient_role: ParticipantRole,
    /// Paid flag from the connection gate for this (project, pair).
    pub paid: bool,
}

/// Why a message was rejected instead of delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ViolationReason {
    /// Indirect contact-exchange attempt over the risk threshold.
    Circumvention {
        risk: u32,
        /// Labels of the heuristic rules that fired.
        signals: Vec<String>,
    },
    /// Sender and recipient roles may not message each other at all.
    RoleRule {
        sender: ParticipantRole,
        recipient: ParticipantRole,
    },
}

impl std::fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationReason::Circumvention { risk, signals } => {
                write!(f, "circumvention risk {} ({})", risk, signals.join(", "))
            }
            ViolationReason::RoleRule { sender, recipient } => {
                write!(f, "{sender}-to-{recipient} messaging is not supported")
            }
        }
    }
}

/// Result of filtering one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterOutcome {
    /// Text may reach the recipient (possibly redacted).
    Delivered {
        text: String,
        redactions: Vec<RedactionEvent>,
    },
    /// Message blocked entirely; no delivered text exists.
    Rejected { reason: ViolationReason },
}

impl FilterOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, FilterOutcome::Rejected { .. })
    }
}

/// Stateless message filter; scales horizontally because the only shared
/// state it reads is the gate's monotonic paid flag (via
/// [`RecipientContext`]).
#[derive(Debug, Clone, Default)]
pub struct ComplianceFilter {
    policy: CompliancePolicy,
}

impl ComplianceFilter {
    pub fn new(policy: CompliancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    /// Evaluates one message. Pure: no I/O, no persistence.
    pub fn filter(&self, raw: &str, _sender: &AgentId, ctx: &RecipientContext) -> FilterOutcome {
        // Role rules come first: unsupported pairs are rejected even for
        // paid connections.
        if let Some(reason) = self.role_violation(ctx) {
            return FilterOutcome::Rejected { reason };
        }

        // Internal coordination traffic is not homeowner<->contractor
        // communication; it bypasses content filtering.
        if ctx.sender_role == ParticipantRole::System
            || ctx.recipient_role == ParticipantRole::System
        {
            return FilterOutcome::Delivered {
                text: raw.to_string(),
                redactions: Vec::new(),
            };
        }

        if ctx.paid {
            return FilterOutcome::Delivered {
                text: raw.to_string(),
                redactions: Vec::new(),
            };
        }

        let (signals, risk) = heuristics::assess(raw);
        if risk >= self.policy.risk_threshold {
            return FilterOutcome::Rejected {
                reason: ViolationReason::Circumvention {
                    risk,
                    signals: signals.into_iter().map(|s| s.label).collect(),
                },
            };
        }

        let (text, redactions) = patterns::redact(raw);
        FilterOutcome::Delivered { text, redactions }
    }

    fn role_violation(&self, ctx: &RecipientContext) -> Option<ViolationReason> {
        let same_human_pair = ctx.sender_role == ctx.recipient_role
            && ctx.sender_role != ParticipantRole::System;
        same_human_pair.then(|| ViolationReason::RoleRule {
            sender: ctx.sender_role,
            recipient: ctx.recipient_role,
        })
    }
}
