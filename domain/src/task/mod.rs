//! Task registry domain model: the task entity, its lifecycle state
//! machine, and the query/escalation value objects built around it.

pub mod entities;
pub mod value_objects;

pub use entities::{Task, TaskStatus};
pub use value_objects::{EscalationPolicy, TaskAttributes, TaskFilter};
