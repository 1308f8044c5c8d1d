//! Connection state: whether a homeowner-contractor pair has completed a
//! paid introduction for a given project.
//!
//! The paid flag is monotonic — it moves false -> true exactly once, on an
//! explicit payment-confirmation event, and never reverts. Until then the
//! pair communicates only through the redacting compliance filter.

use crate::core::ids::{AgentId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the marketplace an agent acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Homeowner,
    Contractor,
    /// Internal coordination agents (bid structuring, matching, messaging).
    System,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &str {
        match self {
            ParticipantRole::Homeowner => "homeowner",
            ParticipantRole::Contractor => "contractor",
            ParticipantRole::System => "system",
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bid standing that established the project/contractor relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    /// Bid submitted, not yet accepted — filtered communication only.
    Pending,
    /// Bid accepted by the homeowner.
    Accepted,
}

/// Per (project, contractor) connection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionState {
    pub project: ProjectId,
    pub contractor: AgentId,
    pub bid: BidStatus,
    /// True once the paid introduction completed.
    pub paid: bool,
    /// Set when `paid` flipped true.
    pub activated_at: Option<DateTime<Utc>>,
}

impl ConnectionState {
    /// Records a fresh relationship (a bid or first-contact intent seen by
    /// the external project store). Starts unpaid.
    pub fn new(project: impl Into<ProjectId>, contractor: impl Into<AgentId>, bid: BidStatus) -> Self {
        Self {
            project: project.into(),
            contractor: contractor.into(),
            bid,
            paid: false,
            activated_at: None,
        }
    }

    /// Marks the connection paid. Idempotent: marking an already-paid pair
    /// is a no-op that keeps the original activation timestamp.
    pub fn mark_paid(&mut self) {
        if !self.paid {
            self.paid = true;
            self.activated_at = Some(Utc::now());
        }
    }
}
