//! HTTP agent transport.
//!
//! Delivers envelopes by POSTing them as JSON to the agent's configured
//! URL. Error mapping is what the retry loop keys on: timeouts and
//! connection failures are transient, an HTTP 4xx is a rejection.

use async_trait::async_trait;
use bidbridge_application::ports::agent_endpoint::{AgentEndpoint, DeliveryAck, EndpointError};
use bidbridge_domain::Envelope;
use std::time::Duration;
use tracing::debug;

/// Endpoint delivering envelopes over HTTP.
pub struct HttpAgentEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpAgentEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            url,
        )
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgentEndpoint for HttpAgentEndpoint {
    async fn accept(&self, envelope: &Envelope) -> Result<DeliveryAck, EndpointError> {
        debug!(url = %self.url, task = %envelope.task_id, "posting envelope");
        let response = self
            .client
            .post(&self.url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EndpointError::Timeout
                } else if e.is_connect() {
                    EndpointError::Connection(e.to_string())
                } else {
                    EndpointError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(DeliveryAck {
                agent: envelope.assignee.clone(),
            })
        } else if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            Err(EndpointError::Rejected(format!("{status}: {body}")))
        } else {
            // 5xx and friends: the agent may recover, let the retry loop
            // decide.
            Err(EndpointError::Connection(format!("HTTP {status}")))
        }
    }
}
