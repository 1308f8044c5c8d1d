//! Dispatch Envelope use case.
//!
//! The single entry point for inbound A2A traffic: validates the envelope
//! shape, drives the task registry, routes produced message content through
//! the compliance filter before it can reach storage or a recipient, and
//! forwards the envelope to the destination agent with bounded-backoff
//! retries.

use crate::ports::agent_endpoint::{AgentEndpoint, AgentRouter, DeliveryAck};
use crate::ports::artifact_store::ArtifactStore;
use crate::ports::connection_gate::ConnectionGate;
use crate::ports::task_store::TaskStore;
use crate::retry::RetryPolicy;
use crate::use_cases::filter_message::{FilterMessageInput, FilterMessageUseCase};
use bidbridge_domain::{
    AgentId, Artifact, ArtifactDraft, DomainError, DraftPayload, Envelope, EnvelopeKind,
    EscalationPolicy, ProjectId, Task, TaskId, TaskStatus, ViolationReason,
};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The dispatch was cancelled while awaiting a downstream delivery;
    /// the associated task has been moved to `Cancelled`.
    #[error("Dispatch cancelled")]
    Cancelled,
}

/// What one dispatch accomplished.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// The task after this dispatch (created, transitioned, or looked up).
    pub task: Option<Task>,
    /// Artifact persisted by this dispatch, if any.
    pub artifact: Option<Artifact>,
    /// Agents that acknowledged delivery.
    pub delivered_to: Vec<AgentId>,
    /// Broadcast recipients whose copy was rejected by the filter.
    pub rejected: Vec<(AgentId, ViolationReason)>,
    /// Broadcast recipients that stayed unreachable after retries.
    pub unreachable: Vec<AgentId>,
}

/// Use case for handling one inbound envelope end to end.
pub struct DispatchEnvelopeUseCase<T, A, G>
where
    T: TaskStore,
    A: ArtifactStore,
    G: ConnectionGate,
{
    tasks: Arc<T>,
    artifacts: Arc<A>,
    gate: Arc<G>,
    router: Arc<AgentRouter>,
    filter: FilterMessageUseCase<G, A>,
    retry: RetryPolicy,
    escalation: EscalationPolicy,
    cancellation_token: Option<CancellationToken>,
}

impl<T, A, G> DispatchEnvelopeUseCase<T, A, G>
where
    T: TaskStore + 'static,
    A: ArtifactStore + 'static,
    G: ConnectionGate + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: Arc<T>,
        artifacts: Arc<A>,
        gate: Arc<G>,
        router: Arc<AgentRouter>,
        filter: FilterMessageUseCase<G, A>,
        retry: RetryPolicy,
        escalation: EscalationPolicy,
        cancellation_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            tasks,
            artifacts,
            gate,
            router,
            filter,
            retry,
            escalation,
            cancellation_token,
        }
    }

    /// Handles one envelope: create, update, attach, cancel, or broadcast.
    ///
    /// Independent envelopes may be dispatched concurrently; per-task
    /// ordering comes from the registry's compare-and-set, not from here.
    pub async fn execute(&self, envelope: Envelope) -> Result<DispatchOutcome, DispatchError> {
        envelope.validate()?;
        debug!(
            task = %envelope.task_id,
            kind = envelope.kind.as_str(),
            creator = %envelope.creator,
            assignee = %envelope.assignee,
            "dispatching envelope"
        );

        match envelope.kind.clone() {
            EnvelopeKind::Create { attributes } => self.handle_create(envelope, attributes).await,
            EnvelopeKind::Update {
                status,
                result,
                error,
            } => self.handle_update(envelope, status, result, error).await,
            EnvelopeKind::AttachArtifact { draft } => self.handle_attach(envelope, draft).await,
            EnvelopeKind::Cancel { reason } => self.handle_cancel(envelope, reason).await,
            EnvelopeKind::Broadcast { project, body } => {
                self.handle_broadcast(envelope, project, body).await
            }
        }
    }

    // ==================== Create ====================

    async fn handle_create(
        &self,
        envelope: Envelope,
        attributes: bidbridge_domain::TaskAttributes,
    ) -> Result<DispatchOutcome, DispatchError> {
        let mut task = Task::new(
            envelope.task_id.clone(),
            envelope.creator.clone(),
            envelope.assignee.clone(),
        )
        .with_attributes(attributes);
        // Parent references are tolerated as forward references: during a
        // creation race the parent's own create envelope may still be in
        // flight, so existence is not checked here.
        if let Some(parent) = &envelope.parent {
            task = task.with_parent(parent.clone());
        }

        let task = self.tasks.create(task).await?;
        info!(task = %task.id, assignee = %task.assignee, "task created");

        let assignee = envelope.assignee.clone();
        let ack = self.forward(&assignee, &envelope).await;
        self.finish_delivery(task.id.clone(), ack, Some(task))
            .await
    }

    // ==================== Update ====================

    async fn handle_update(
        &self,
        envelope: Envelope,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let task = self
            .tasks
            .transition(&envelope.task_id, status, result, error)
            .await?;
        info!(task = %task.id, status = %task.status, "task transitioned");

        if status == TaskStatus::Failed {
            self.escalate_failure(&task).await;
        }

        // The creator is the interested party for progress updates.
        let creator = envelope.creator.clone();
        let ack = self.forward(&creator, &envelope).await;
        self.finish_delivery(task.id.clone(), ack, Some(task)).await
    }

    /// Applies the configured parent escalation policy. Best-effort: a
    /// parent that is already terminal (or not yet created) is left alone.
    async fn escalate_failure(&self, child: &Task) {
        if self.escalation != EscalationPolicy::FailParent {
            return;
        }
        let Some(parent) = &child.parent else {
            return;
        };
        let error = format!("child task '{}' failed", child.id);
        match self
            .tasks
            .transition(parent, TaskStatus::Failed, None, Some(error))
            .await
        {
            Ok(parent) => info!(parent = %parent.id, child = %child.id, "parent failed by escalation"),
            Err(e) if e.is_conflict() => {
                debug!(parent = %parent, "parent already terminal; escalation skipped");
            }
            Err(e) => warn!(parent = %parent, error = %e, "parent escalation failed"),
        }
    }

    // ==================== Attach artifact ====================

    async fn handle_attach(
        &self,
        envelope: Envelope,
        draft: ArtifactDraft,
    ) -> Result<DispatchOutcome, DispatchError> {
        // The owning task must exist for any artifact kind.
        let task = self.tasks.get(&envelope.task_id).await?;

        match draft.payload.into_stored() {
            Ok(payload) => {
                let mut artifact =
                    Artifact::new(task.id.clone(), envelope.creator.clone(), payload)
                        .with_attributes(draft.attributes);
                if let Some(old) = draft.supersedes {
                    artifact = artifact.superseding(old);
                }
                let artifact = self.artifacts.put(artifact).await?;
                debug!(task = %task.id, artifact = %artifact.id, kind = %artifact.kind(), "artifact stored");

                let assignee = envelope.assignee.clone();
                let ack = self.forward(&assignee, &envelope).await;
                let mut outcome = self
                    .finish_delivery(task.id.clone(), ack, Some(task))
                    .await?;
                outcome.artifact = Some(artifact);
                Ok(outcome)
            }
            Err(DraftPayload::Message {
                project,
                recipient,
                body,
            }) => {
                self.handle_message(envelope, task, project, recipient, body)
                    .await
            }
            Err(_) => unreachable!("into_stored only returns message drafts"),
        }
    }

    /// Messages are filtered before they can reach storage or the
    /// recipient; the forwarded envelope carries the *delivered* text, so
    /// raw content never leaves this call.
    async fn handle_message(
        &self,
        envelope: Envelope,
        task: Task,
        project: ProjectId,
        recipient: AgentId,
        body: String,
    ) -> Result<DispatchOutcome, DispatchError> {
        let artifact = self
            .filter
            .execute(FilterMessageInput {
                task: task.id.clone(),
                project: project.clone(),
                sender: envelope.creator.clone(),
                recipient: recipient.clone(),
                raw: body,
            })
            .await?;

        let delivered = match &artifact.payload {
            bidbridge_domain::ArtifactPayload::Message { delivered, .. } => delivered.clone(),
            _ => unreachable!("filter use case always stores a message payload"),
        };
        let forward = self.forward_message(&envelope, project, &recipient, delivered);

        let ack = self.forward(&recipient, &forward).await;
        let mut outcome = self
            .finish_delivery(task.id.clone(), ack, Some(task))
            .await?;
        outcome.artifact = Some(artifact);
        Ok(outcome)
    }

    // ==================== Cancel ====================

    async fn handle_cancel(
        &self,
        envelope: Envelope,
        reason: Option<String>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let task = self
            .tasks
            .transition(&envelope.task_id, TaskStatus::Cancelled, None, reason)
            .await?;
        info!(task = %task.id, "task cancelled");

        let assignee = envelope.assignee.clone();
        let ack = self.forward(&assignee, &envelope).await;
        self.finish_delivery(task.id.clone(), ack, Some(task)).await
    }

    // ==================== Broadcast ====================

    /// Fans one message out to every contractor related to the project.
    /// Each recipient is filtered against its *own* paid state, so one
    /// broadcast can pass through to a paid contractor and arrive redacted
    /// at an unpaid one.
    async fn handle_broadcast(
        &self,
        envelope: Envelope,
        project: ProjectId,
        body: String,
    ) -> Result<DispatchOutcome, DispatchError> {
        let task = self.tasks.get(&envelope.task_id).await?;
        let recipients = self.gate.contractors_for_project(&project).await?;
        info!(
            task = %task.id,
            project = %project,
            recipients = recipients.len(),
            "broadcasting message"
        );

        let mut outcome = DispatchOutcome {
            task: Some(task.clone()),
            ..Default::default()
        };

        for recipient in recipients {
            let filtered = self
                .filter
                .execute(FilterMessageInput {
                    task: task.id.clone(),
                    project: project.clone(),
                    sender: envelope.creator.clone(),
                    recipient: recipient.clone(),
                    raw: body.clone(),
                })
                .await;

            let artifact = match filtered {
                Ok(artifact) => artifact,
                Err(DomainError::ComplianceViolation { reason }) => {
                    outcome.rejected.push((recipient, reason));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let delivered = match &artifact.payload {
                bidbridge_domain::ArtifactPayload::Message { delivered, .. } => delivered.clone(),
                _ => unreachable!("filter use case always stores a message payload"),
            };
            let forward = self.forward_message(&envelope, project.clone(), &recipient, delivered);

            match self.forward(&recipient, &forward).await {
                Ok(ack) => outcome.delivered_to.push(ack.agent),
                Err(ForwardError::Cancelled) => {
                    self.cancel_task_best_effort(&task.id).await;
                    return Err(DispatchError::Cancelled);
                }
                Err(ForwardError::Failed(e)) => {
                    // A single unreachable bidder does not sink the whole
                    // broadcast; the failure is recorded per recipient.
                    warn!(recipient = %recipient, error = %e, "broadcast recipient unreachable");
                    outcome.unreachable.push(recipient);
                }
            }
        }

        Ok(outcome)
    }

    // ==================== Delivery plumbing ====================

    /// Builds the envelope forwarded to a message recipient. The draft
    /// carries the *delivered* text, and the sender's pseudonymous label
    /// rides along so the recipient can display it instead of the raw id.
    fn forward_message(
        &self,
        envelope: &Envelope,
        project: ProjectId,
        recipient: &AgentId,
        delivered: String,
    ) -> Envelope {
        let mut draft = ArtifactDraft::new(DraftPayload::Message {
            project,
            recipient: recipient.clone(),
            body: delivered,
        });
        if let Some(alias) = self.router.alias(&envelope.creator) {
            draft.attributes.insert("sender_alias".into(), alias.into());
        }
        Envelope {
            task_id: envelope.task_id.clone(),
            creator: envelope.creator.clone(),
            assignee: recipient.clone(),
            parent: envelope.parent.clone(),
            kind: EnvelopeKind::AttachArtifact { draft },
        }
    }

    async fn forward(
        &self,
        destination: &AgentId,
        envelope: &Envelope,
    ) -> Result<DeliveryAck, ForwardError> {
        let Some(endpoint) = self.router.endpoint(destination) else {
            return Err(ForwardError::Failed(DomainError::NotFound {
                entity: "Agent route",
                id: destination.to_string(),
            }));
        };
        deliver_with_retry(
            endpoint.as_ref(),
            destination,
            envelope,
            &self.retry,
            self.cancellation_token.as_ref(),
        )
        .await
    }

    /// Folds a delivery result into the dispatch outcome: exhausted
    /// retries fail the task (when it is not already terminal) and then
    /// surface; cancellation cancels it.
    async fn finish_delivery(
        &self,
        task_id: TaskId,
        ack: Result<DeliveryAck, ForwardError>,
        task: Option<Task>,
    ) -> Result<DispatchOutcome, DispatchError> {
        match ack {
            Ok(ack) => Ok(DispatchOutcome {
                task,
                delivered_to: vec![ack.agent],
                ..Default::default()
            }),
            Err(ForwardError::Cancelled) => {
                self.cancel_task_best_effort(&task_id).await;
                Err(DispatchError::Cancelled)
            }
            Err(ForwardError::Failed(e)) => {
                self.fail_task_best_effort(&task_id, &e).await;
                Err(e.into())
            }
        }
    }

    async fn fail_task_best_effort(&self, task_id: &TaskId, cause: &DomainError) {
        match self
            .tasks
            .transition(task_id, TaskStatus::Failed, None, Some(cause.to_string()))
            .await
        {
            Ok(_) => warn!(task = %task_id, "task failed after delivery retries exhausted"),
            Err(e) if e.is_conflict() => {
                debug!(task = %task_id, "task already terminal; failure not recorded")
            }
            Err(e) => warn!(task = %task_id, error = %e, "could not record delivery failure"),
        }
    }

    async fn cancel_task_best_effort(&self, task_id: &TaskId) {
        match self
            .tasks
            .transition(task_id, TaskStatus::Cancelled, None, Some("dispatch cancelled".into()))
            .await
        {
            Ok(_) => info!(task = %task_id, "task cancelled mid-dispatch"),
            Err(e) if e.is_conflict() => {
                debug!(task = %task_id, "task already terminal; cancellation not recorded")
            }
            Err(e) => warn!(task = %task_id, error = %e, "could not record cancellation"),
        }
    }
}

/// Internal delivery result: cancellation is distinct from failure because
/// it moves the task to `Cancelled` rather than `Failed`.
enum ForwardError {
    Failed(DomainError),
    Cancelled,
}

/// Delivers one envelope with bounded exponential backoff.
///
/// Transient errors (timeout, connection) are retried until the policy's
/// attempt ceiling; permanent errors surface immediately. Cancellation is
/// observed only while waiting between attempts — an in-flight `accept`
/// runs to completion.
async fn deliver_with_retry(
    endpoint: &dyn AgentEndpoint,
    destination: &AgentId,
    envelope: &Envelope,
    retry: &RetryPolicy,
    cancellation_token: Option<&CancellationToken>,
) -> Result<DeliveryAck, ForwardError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let error = match endpoint.accept(envelope).await {
            Ok(ack) => return Ok(ack),
            Err(e) => e,
        };

        if !error.is_transient() || !retry.allows_retry(attempts) {
            return Err(ForwardError::Failed(DomainError::DownstreamUnavailable {
                agent: destination.clone(),
                attempts,
                message: error.to_string(),
            }));
        }

        let delay = retry.next_delay(attempts);
        debug!(
            destination = %destination,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "delivery failed; backing off"
        );
        match cancellation_token {
            Some(token) => {
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = token.cancelled() => return Err(ForwardError::Cancelled),
                }
            }
            None => sleep(delay).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::agent_endpoint::EndpointError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Endpoint double that fails a scripted number of times before
    /// acknowledging.
    struct FlakyEndpoint {
        failures: AtomicU32,
        calls: AtomicU32,
        error: EndpointError,
    }

    impl FlakyEndpoint {
        fn new(failures: u32, error: EndpointError) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                error,
            }
        }
    }

    #[async_trait]
    impl AgentEndpoint for FlakyEndpoint {
        async fn accept(&self, envelope: &Envelope) -> Result<DeliveryAck, EndpointError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| f.checked_sub(1))
                .is_ok()
            {
                return Err(self.error.clone());
            }
            Ok(DeliveryAck {
                agent: envelope.assignee.clone(),
            })
        }
    }

    fn envelope() -> Envelope {
        Envelope::new(
            "task-1",
            "homeowner-agent-001",
            "bid-card-agent-001",
            EnvelopeKind::Create {
                attributes: Default::default(),
            },
        )
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            base_delay: std::time::Duration::from_millis(100),
            multiplier: 2.0,
            max_attempts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_to_success() {
        let endpoint = FlakyEndpoint::new(2, EndpointError::Timeout);
        let dest = AgentId::new("bid-card-agent-001");

        let ack = deliver_with_retry(&endpoint, &dest, &envelope(), &policy(4), None)
            .await
            .ok()
            .expect("delivery should eventually succeed");
        assert_eq!(ack.agent, dest);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_downstream_unavailable() {
        let endpoint = FlakyEndpoint::new(10, EndpointError::Connection("refused".into()));
        let dest = AgentId::new("bid-card-agent-001");

        let err = deliver_with_retry(&endpoint, &dest, &envelope(), &policy(3), None).await;
        let Err(ForwardError::Failed(DomainError::DownstreamUnavailable {
            agent, attempts, ..
        })) = err
        else {
            panic!("expected DownstreamUnavailable");
        };
        assert_eq!(agent, dest);
        assert_eq!(attempts, 3);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let endpoint = FlakyEndpoint::new(10, EndpointError::Rejected("bad schema".into()));
        let dest = AgentId::new("bid-card-agent-001");

        let err = deliver_with_retry(&endpoint, &dest, &envelope(), &policy(5), None).await;
        assert!(matches!(err, Err(ForwardError::Failed(_))));
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_the_backoff_wait() {
        let endpoint = FlakyEndpoint::new(10, EndpointError::Timeout);
        let dest = AgentId::new("bid-card-agent-001");
        let token = CancellationToken::new();
        token.cancel();

        let err =
            deliver_with_retry(&endpoint, &dest, &envelope(), &policy(5), Some(&token)).await;
        assert!(matches!(err, Err(ForwardError::Cancelled)));
        // One attempt ran; the wait before the second was interrupted.
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    /// Endpoint double that records everything it accepts.
    pub(crate) struct RecordingEndpoint {
        pub accepted: Mutex<Vec<Envelope>>,
    }

    impl RecordingEndpoint {
        pub(crate) fn new() -> Self {
            Self {
                accepted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentEndpoint for RecordingEndpoint {
        async fn accept(&self, envelope: &Envelope) -> Result<DeliveryAck, EndpointError> {
            self.accepted.lock().unwrap().push(envelope.clone());
            Ok(DeliveryAck {
                agent: envelope.assignee.clone(),
            })
        }
    }

    #[tokio::test]
    async fn recording_endpoint_acks_immediately() {
        let endpoint = RecordingEndpoint::new();
        let dest = AgentId::new("bid-card-agent-001");
        let env = envelope();

        let ack = deliver_with_retry(&endpoint, &dest, &env, &policy(1), None).await;
        assert!(ack.is_ok());
        assert_eq!(endpoint.accepted.lock().unwrap().len(), 1);
    }
}
