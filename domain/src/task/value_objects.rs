//! Task value objects: attribute bags, query filters, escalation policy.

use super::entities::TaskStatus;
use crate::core::ids::{AgentId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Domain-specific extension fields attached to a task.
///
/// Free-form per the envelope contract, but validated at the system boundary
/// when the envelope is parsed — inside the core it is an ordinary typed map,
/// never an opaque blob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskAttributes(HashMap<String, serde_json::Value>);

impl TaskAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, serde_json::Value)> for TaskAttributes {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<HashMap<String, serde_json::Value>> for TaskAttributes {
    fn from(map: HashMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Query filter for the task registry.
///
/// All set fields must match (conjunction). Results are ordered by creation
/// time ascending.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub creator: Option<AgentId>,
    pub assignee: Option<AgentId>,
    pub status: Option<TaskStatus>,
    pub parent: Option<TaskId>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_creator(mut self, creator: impl Into<AgentId>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn by_assignee(mut self, assignee: impl Into<AgentId>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn by_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn by_parent(mut self, parent: impl Into<TaskId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Whether the given task matches every set field.
    pub fn matches(&self, task: &super::entities::Task) -> bool {
        if let Some(creator) = &self.creator
            && &task.creator != creator
        {
            return false;
        }
        if let Some(assignee) = &self.assignee
            && &task.assignee != assignee
        {
            return false;
        }
        if let Some(status) = &self.status
            && &task.status != status
        {
            return false;
        }
        if let Some(parent) = &self.parent
            && task.parent.as_ref() != Some(parent)
        {
            return false;
        }
        true
    }
}

/// Parent/child failure escalation policy.
///
/// The registry records `parent` linkage but never cascades failures on its
/// own; the dispatcher applies whichever policy the deployment configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPolicy {
    /// A child failure leaves the parent untouched (default).
    #[default]
    None,
    /// A child entering `Failed` also moves the parent to `Failed`.
    FailParent,
}
