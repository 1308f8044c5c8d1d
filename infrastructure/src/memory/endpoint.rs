//! In-process agent endpoint.
//!
//! Records every accepted envelope and can be scripted to fail a number of
//! times first, which is how delivery retry behavior is exercised without a
//! network.

use async_trait::async_trait;
use bidbridge_application::ports::agent_endpoint::{AgentEndpoint, DeliveryAck, EndpointError};
use bidbridge_domain::Envelope;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Endpoint that accepts envelopes into an in-memory inbox.
pub struct InProcessEndpoint {
    inbox: Mutex<Vec<Envelope>>,
    failures_remaining: AtomicU32,
    failure: Mutex<EndpointError>,
}

impl InProcessEndpoint {
    pub fn new() -> Self {
        Self {
            inbox: Mutex::new(Vec::new()),
            failures_remaining: AtomicU32::new(0),
            failure: Mutex::new(EndpointError::Timeout),
        }
    }

    /// Scripts the next `count` deliveries to fail with `error`.
    pub fn fail_next(&self, count: u32, error: EndpointError) {
        *self.failure.lock().unwrap() = error;
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Envelopes accepted so far, in arrival order.
    pub fn inbox(&self) -> Vec<Envelope> {
        self.inbox.lock().unwrap().clone()
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.lock().unwrap().len()
    }
}

impl Default for InProcessEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentEndpoint for InProcessEndpoint {
    async fn accept(&self, envelope: &Envelope) -> Result<DeliveryAck, EndpointError> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(self.failure.lock().unwrap().clone());
        }
        self.inbox.lock().unwrap().push(envelope.clone());
        Ok(DeliveryAck {
            agent: envelope.assignee.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidbridge_domain::{EnvelopeKind, TaskAttributes};

    fn envelope(task: &str) -> Envelope {
        Envelope::new(
            task,
            "homeowner-agent-001",
            "bid-card-agent-001",
            EnvelopeKind::Create {
                attributes: TaskAttributes::new(),
            },
        )
    }

    #[tokio::test]
    async fn accepts_into_inbox_in_order() {
        let endpoint = InProcessEndpoint::new();
        endpoint.accept(&envelope("t1")).await.unwrap();
        endpoint.accept(&envelope("t2")).await.unwrap();

        let inbox = endpoint.inbox();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].task_id.as_str(), "t1");
        assert_eq!(inbox[1].task_id.as_str(), "t2");
    }

    #[tokio::test]
    async fn scripted_failures_burn_down_then_accept() {
        let endpoint = InProcessEndpoint::new();
        endpoint.fail_next(2, EndpointError::Connection("refused".into()));

        assert!(endpoint.accept(&envelope("t1")).await.is_err());
        assert!(endpoint.accept(&envelope("t1")).await.is_err());
        assert!(endpoint.accept(&envelope("t1")).await.is_ok());
        assert_eq!(endpoint.inbox_len(), 1);
    }
}
