//! In-memory task registry.
//!
//! The default single-process registry: a mutex-guarded map plus an
//! insertion sequence for stable query ordering. The compare-and-set lives
//! in [`Task::apply_transition`]; holding the map lock across the
//! check-and-apply is what makes terminal states race-free.

use async_trait::async_trait;
use bidbridge_application::ports::task_store::TaskStore;
use bidbridge_domain::{DomainError, Task, TaskFilter, TaskId, TaskStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

struct Stored {
    task: Task,
    seq: u64,
}

/// Mutex-guarded map implementation of the task registry.
#[derive(Default)]
pub struct InMemoryTaskStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<TaskId, Stored>,
    next_seq: u64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.tasks.get(&task.id) {
            if existing.task.same_creation(&task) {
                debug!(task = %task.id, "duplicate create; returning stored task");
                return Ok(existing.task.clone());
            }
            return Err(DomainError::Conflict(format!(
                "task '{}' already exists with a different payload",
                task.id
            )));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.insert(
            task.id.clone(),
            Stored {
                task: task.clone(),
                seq,
            },
        );
        Ok(task)
    }

    async fn transition(
        &self,
        id: &TaskId,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<Task, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| DomainError::task_not_found(id.as_str()))?;
        stored.task.apply_transition(status, result, error)?;
        Ok(stored.task.clone())
    }

    async fn get(&self, id: &TaskId) -> Result<Task, DomainError> {
        let inner = self.inner.lock().unwrap();
        inner
            .tasks
            .get(id)
            .map(|s| s.task.clone())
            .ok_or_else(|| DomainError::task_not_found(id.as_str()))
    }

    async fn query(&self, filter: TaskFilter) -> Result<Vec<Task>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut hits: Vec<&Stored> = inner
            .tasks
            .values()
            .filter(|s| filter.matches(&s.task))
            .collect();
        hits.sort_by_key(|s| s.seq);
        Ok(hits.into_iter().map(|s| s.task.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn task(id: &str) -> Task {
        Task::new(id, "homeowner-agent-001", "bid-card-agent-001")
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryTaskStore::new();
        store.create(task("t1")).await.unwrap();

        let got = store.get(&"t1".into()).await.unwrap();
        assert_eq!(got.status, TaskStatus::Pending);
        assert_eq!(got.assignee.as_str(), "bid-card-agent-001");
    }

    #[tokio::test]
    async fn duplicate_create_with_same_payload_is_idempotent() {
        let store = InMemoryTaskStore::new();
        store.create(task("t1")).await.unwrap();
        store
            .transition(&"t1".into(), TaskStatus::InProgress, None, None)
            .await
            .unwrap();

        // The retry arrives after the original progressed; it still
        // succeeds and reflects current state.
        let again = store.create(task("t1")).await.unwrap();
        assert_eq!(again.status, TaskStatus::InProgress);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_with_different_payload_conflicts() {
        let store = InMemoryTaskStore::new();
        store.create(task("t1")).await.unwrap();

        let other = Task::new("t1", "homeowner-agent-001", "matching-agent-001");
        let err = store.create(other).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn transition_on_unknown_task_is_not_found() {
        let store = InMemoryTaskStore::new();
        let err = store
            .transition(&"ghost".into(), TaskStatus::InProgress, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn terminal_state_rejects_further_transitions() {
        let store = InMemoryTaskStore::new();
        store.create(task("t1")).await.unwrap();
        store
            .transition(&"t1".into(), TaskStatus::InProgress, None, None)
            .await
            .unwrap();
        store
            .transition(&"t1".into(), TaskStatus::Completed, None, None)
            .await
            .unwrap();

        let err = store
            .transition(&"t1".into(), TaskStatus::Failed, None, Some("late".into()))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn exactly_one_racer_reaches_a_terminal_state() {
        let store = Arc::new(InMemoryTaskStore::new());
        store.create(task("t1")).await.unwrap();
        store
            .transition(&"t1".into(), TaskStatus::InProgress, None, None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for status in [
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
            TaskStatus::Completed,
        ] {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.transition(&"t1".into(), status, None, None).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);

        let final_task = store.get(&"t1".into()).await.unwrap();
        assert!(final_task.status.is_terminal());
        assert!(final_task.completed_at.is_some());
    }

    #[tokio::test]
    async fn query_filters_and_orders_by_creation() {
        let store = InMemoryTaskStore::new();
        store.create(task("t1")).await.unwrap();
        store
            .create(Task::new("t2", "homeowner-agent-001", "matching-agent-001").with_parent("t1"))
            .await
            .unwrap();
        store
            .create(Task::new("t3", "homeowner-agent-001", "matching-agent-001").with_parent("t1"))
            .await
            .unwrap();

        let children = store
            .query(TaskFilter::new().by_parent("t1"))
            .await
            .unwrap();
        let ids: Vec<&str> = children.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3"]);

        let all = store.query(TaskFilter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id.as_str(), "t1");
    }
}
