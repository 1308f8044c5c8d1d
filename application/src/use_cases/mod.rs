//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod dispatch_envelope;
pub mod filter_message;
