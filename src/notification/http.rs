//! HTTP delivery for chat webhooks (Slack, Teams, Discord) and generic
//! webhook endpoints.

use crate::config::WebhookEndpoint;
use crate::core::{ChannelPayload, ChannelSender, EndpointOutcome};
use crate::error::ChannelError;
use crate::internal_metrics::Metrics;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Posts JSON payloads over a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpSender {
    client: Client,
}

impl HttpSender {
    /// Creates a new `HttpSender`.
    pub fn new() -> Result<Self, ChannelError> {
        let client = Client::builder()
            .user_agent(concat!("alertrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Sends one POST and treats any non-2xx answer as a failure.
    async fn post(
        &self,
        url: &str,
        body: &Value,
        endpoint: Option<&WebhookEndpoint>,
    ) -> Result<StatusCode, ChannelError> {
        let mut request = self.client.post(url).json(body);
        if let Some(endpoint) = endpoint {
            request = request.timeout(Duration::from_millis(endpoint.timeout_ms()));
            for (name, value) in &endpoint.headers {
                request = request.header(name, value);
            }
        }

        let response = request.send().await.map_err(|e| {
            error!(url, error = %e, "HTTP request failed");
            ChannelError::Http(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(url, %status, "HTTP delivery accepted");
            Ok(status)
        } else {
            let text = response.text().await.unwrap_or_default();
            error!(url, status = %status, body = %text, "HTTP delivery rejected");
            Err(ChannelError::Status { status, body: text })
        }
    }

    /// Posts `body` to every endpoint concurrently.
    ///
    /// One endpoint failing never stops the others; each gets its own result,
    /// in configuration order.
    #[instrument(skip(self, endpoints, body), fields(count = endpoints.len()))]
    pub async fn post_endpoints(
        &self,
        endpoints: &[WebhookEndpoint],
        body: &Value,
    ) -> Vec<EndpointOutcome> {
        let attempts = endpoints.iter().map(|endpoint| async move {
            let result = self.post(&endpoint.url, body, Some(endpoint)).await;
            Metrics::record_endpoint(result.is_ok());
            match result {
                Ok(status) => EndpointOutcome {
                    name: endpoint.display_name().to_string(),
                    url: endpoint.url.clone(),
                    success: true,
                    status: Some(status.as_u16()),
                    error: None,
                },
                Err(e) => {
                    warn!(endpoint = endpoint.display_name(), error = %e, "Webhook endpoint delivery failed");
                    EndpointOutcome {
                        name: endpoint.display_name().to_string(),
                        url: endpoint.url.clone(),
                        success: false,
                        status: match &e {
                            ChannelError::Status { status, .. } => Some(status.as_u16()),
                            _ => None,
                        },
                        error: Some(e.to_string()),
                    }
                }
            }
        });

        let outcomes = join_all(attempts).await;
        let failed = outcomes.iter().filter(|o| !o.success).count();
        info!(
            delivered = outcomes.len() - failed,
            failed, "Finished webhook endpoint fan-out"
        );
        outcomes
    }
}

#[async_trait]
impl ChannelSender for HttpSender {
    async fn deliver(&self, payload: &ChannelPayload) -> Result<Value, ChannelError> {
        match payload {
            ChannelPayload::Post { url, body } => {
                let status = self.post(url, body, None).await?;
                Ok(json!({ "status": status.as_u16() }))
            }
            ChannelPayload::Endpoints { endpoints, body } => {
                let outcomes = self.post_endpoints(endpoints, body).await;
                Ok(json!(outcomes))
            }
            ChannelPayload::Email(_) => Err(ChannelError::NotConfigured(
                "email payloads need an SMTP sender".to_string(),
            )),
        }
    }
}
