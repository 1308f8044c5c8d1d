//! Inter-agent message compliance filter.
//!
//! Split into deterministic structured-identifier redaction
//! ([`patterns`]) and fail-closed circumvention heuristics
//! ([`heuristics`]), combined by the pure [`ComplianceFilter`].

pub mod filter;
pub mod heuristics;
pub mod patterns;

pub use filter::{ComplianceFilter, CompliancePolicy, FilterOutcome, RecipientContext, ViolationReason};
pub use heuristics::CircumventionSignal;
pub use patterns::{RedactionCategory, RedactionEvent};
