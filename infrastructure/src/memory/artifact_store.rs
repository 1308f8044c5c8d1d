//! In-memory artifact store.
//!
//! Append-only vector behind a mutex; insertion order doubles as the list
//! order the port promises. Task existence is checked against the task
//! registry the store is constructed with.

use async_trait::async_trait;
use bidbridge_application::ports::artifact_store::ArtifactStore;
use bidbridge_application::ports::task_store::TaskStore;
use bidbridge_domain::{Artifact, ArtifactKind, DomainError, TaskId};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Append-only in-memory artifact store.
pub struct InMemoryArtifactStore<T: TaskStore> {
    tasks: Arc<T>,
    artifacts: Mutex<Vec<Artifact>>,
    /// When false, artifacts attached after the owning task reached a
    /// terminal state are rejected with `Conflict`. Late results from slow
    /// agents are accepted by default.
    accept_after_terminal: bool,
}

impl<T: TaskStore> InMemoryArtifactStore<T> {
    pub fn new(tasks: Arc<T>) -> Self {
        Self {
            tasks,
            artifacts: Mutex::new(Vec::new()),
            accept_after_terminal: true,
        }
    }

    /// Sets whether artifacts are still accepted once the owning task is
    /// terminal. Wired from `[orchestration].accept_artifacts_after_terminal`.
    pub fn accept_after_terminal(mut self, accept: bool) -> Self {
        self.accept_after_terminal = accept;
        self
    }

    pub fn reject_after_terminal(self) -> Self {
        self.accept_after_terminal(false)
    }

    pub fn len(&self) -> usize {
        self.artifacts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl<T: TaskStore> ArtifactStore for InMemoryArtifactStore<T> {
    async fn put(&self, artifact: Artifact) -> Result<Artifact, DomainError> {
        let task = self.tasks.get(&artifact.task_id).await?;
        if task.status.is_terminal() && !self.accept_after_terminal {
            return Err(DomainError::Conflict(format!(
                "task '{}' is {} and no longer accepts artifacts",
                task.id, task.status
            )));
        }
        debug!(task = %artifact.task_id, artifact = %artifact.id, kind = %artifact.kind(), "artifact stored");
        self.artifacts.lock().unwrap().push(artifact.clone());
        Ok(artifact)
    }

    async fn list_by_task(&self, task_id: &TaskId) -> Result<Vec<Artifact>, DomainError> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| &a.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn list_by_kind(&self, kind: ArtifactKind) -> Result<Vec<Artifact>, DomainError> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.kind() == kind)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::task_store::InMemoryTaskStore;
    use bidbridge_domain::{ArtifactPayload, Task, TaskStatus};
    use serde_json::json;

    async fn store_with_task(id: &str) -> (Arc<InMemoryTaskStore>, InMemoryArtifactStore<InMemoryTaskStore>) {
        let tasks = Arc::new(InMemoryTaskStore::new());
        tasks
            .create(Task::new(id, "homeowner-agent-001", "bid-card-agent-001"))
            .await
            .unwrap();
        let artifacts = InMemoryArtifactStore::new(Arc::clone(&tasks));
        (tasks, artifacts)
    }

    fn generated(task: &str) -> Artifact {
        Artifact::new(
            task,
            "bid-card-agent-001",
            ArtifactPayload::Generated {
                content: json!({"budget": 5000}),
            },
        )
    }

    #[tokio::test]
    async fn put_requires_an_existing_task() {
        let (_tasks, artifacts) = store_with_task("t1").await;
        let err = artifacts.put(generated("ghost")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn artifacts_list_in_insertion_order() {
        let (_tasks, artifacts) = store_with_task("t1").await;
        let first = artifacts.put(generated("t1")).await.unwrap();
        let second = artifacts.put(generated("t1")).await.unwrap();

        let listed = artifacts.list_by_task(&"t1".into()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn late_artifacts_are_accepted_by_default() {
        let (tasks, artifacts) = store_with_task("t1").await;
        tasks
            .transition(&"t1".into(), TaskStatus::InProgress, None, None)
            .await
            .unwrap();
        tasks
            .transition(&"t1".into(), TaskStatus::Completed, None, None)
            .await
            .unwrap();

        assert!(artifacts.put(generated("t1")).await.is_ok());
    }

    #[tokio::test]
    async fn reject_after_terminal_policy_conflicts_on_late_artifacts() {
        let tasks = Arc::new(InMemoryTaskStore::new());
        tasks
            .create(Task::new("t1", "homeowner-agent-001", "bid-card-agent-001"))
            .await
            .unwrap();
        let artifacts = InMemoryArtifactStore::new(Arc::clone(&tasks)).reject_after_terminal();

        tasks
            .transition(&"t1".into(), TaskStatus::Cancelled, None, None)
            .await
            .unwrap();
        let err = artifacts.put(generated("t1")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn terminal_policy_follows_the_orchestration_config() {
        let config: crate::config::FileConfig = toml::from_str(
            r#"
            [orchestration]
            accept_artifacts_after_terminal = false
        "#,
        )
        .unwrap();

        let tasks = Arc::new(InMemoryTaskStore::new());
        tasks
            .create(Task::new("t1", "homeowner-agent-001", "bid-card-agent-001"))
            .await
            .unwrap();
        let artifacts = InMemoryArtifactStore::new(Arc::clone(&tasks))
            .accept_after_terminal(config.orchestration.accept_artifacts_after_terminal);

        tasks
            .transition(&"t1".into(), TaskStatus::Cancelled, None, None)
            .await
            .unwrap();
        assert!(artifacts.put(generated("t1")).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn list_by_kind_spans_tasks() {
        let (tasks, artifacts) = store_with_task("t1").await;
        tasks
            .create(Task::new("t2", "homeowner-agent-001", "matching-agent-001"))
            .await
            .unwrap();
        artifacts.put(generated("t1")).await.unwrap();
        artifacts.put(generated("t2")).await.unwrap();
        artifacts
            .put(Artifact::new(
                "t2",
                "matching-agent-001",
                ArtifactPayload::Document {
                    content: Some("shortlist".into()),
                    reference: None,
                },
            ))
            .await
            .unwrap();

        let generated = artifacts.list_by_kind(ArtifactKind::Generated).await.unwrap();
        assert_eq!(generated.len(), 2);
        let documents = artifacts.list_by_kind(ArtifactKind::Document).await.unwrap();
        assert_eq!(documents.len(), 1);
    }
}
