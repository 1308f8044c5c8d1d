//! Durable logging adapters

mod jsonl_audit;

pub use jsonl_audit::JsonlAuditLog;
