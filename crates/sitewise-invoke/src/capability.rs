//! HTTP capability invoker

use async_trait::async_trait;
use reqwest::StatusCode;
use sitewise_core::error::{Result, SitewiseError};
use sitewise_core::models::{CapabilityRequest, CapabilityResponse};
use sitewise_core::retry::{retry_transient, RetryPolicy};
use std::time::{Duration, Instant};

use crate::ports::CapabilityInvoker;

/// Header selecting fire-and-forget invocation
pub const INVOCATION_TYPE_HEADER: &str = "X-Invocation-Type";

/// Capability gateway reached over HTTP.
///
/// Functions are invoked with `POST {base_url}/functions/{id}/invoke`; the
/// body is the [`CapabilityRequest`] and the reply a [`CapabilityResponse`].
pub struct HttpCapabilityInvoker {
    /// Base URL of the capability gateway (e.g., "http://localhost:9000")
    base_url: String,

    /// Per-request timeout
    timeout: Duration,

    client: reqwest::Client,
}

impl HttpCapabilityInvoker {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Create with default localhost URL
    pub fn localhost() -> Self {
        Self::new("http://localhost:9000", Duration::from_secs(60))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn invoke_url(&self, function: &str) -> String {
        format!("{}/functions/{}/invoke", self.base_url, function)
    }

    fn transport_error(&self, function: &str, started: Instant, err: reqwest::Error) -> SitewiseError {
        if err.is_timeout() {
            SitewiseError::CapabilityTimeout {
                function: function.to_string(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            }
        } else {
            SitewiseError::CapabilityFailed {
                function: function.to_string(),
                reason: format!("Failed to reach capability gateway at {}: {}", self.base_url, err),
                transient: err.is_connect(),
            }
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy
fn status_error(function: &str, status: StatusCode, body: String) -> SitewiseError {
    let function = function.to_string();
    match status {
        StatusCode::NOT_FOUND => SitewiseError::CapabilityNotFound { function },
        StatusCode::TOO_MANY_REQUESTS => SitewiseError::Throttled { function },
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => {
            SitewiseError::CapabilityTimeout { function, elapsed_ms: 0 }
        }
        status => SitewiseError::CapabilityFailed {
            function,
            reason: format!("Capability gateway error ({}): {}", status, body),
            transient: status.is_server_error(),
        },
    }
}

#[async_trait]
impl CapabilityInvoker for HttpCapabilityInvoker {
    async fn invoke(&self, function: &str, request: &CapabilityRequest) -> Result<CapabilityResponse> {
        let started = Instant::now();
        tracing::debug!(function, url = %self.invoke_url(function), "Invoking capability");

        let response = self
            .client
            .post(self.invoke_url(function))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(function, started, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(function, status, body));
        }

        let reply: CapabilityResponse = response.json().await.map_err(|e| {
            SitewiseError::CapabilityFailed {
                function: function.to_string(),
                reason: format!("Failed to parse capability response: {}", e),
                transient: false,
            }
        })?;

        if !reply.success {
            return Err(SitewiseError::CapabilityFailed {
                function: function.to_string(),
                reason: reply.error.unwrap_or_else(|| "capability reported failure".to_string()),
                transient: false,
            });
        }

        tracing::debug!(
            function,
            result_type = %reply.result_type,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Capability completed"
        );
        Ok(reply)
    }

    async fn invoke_async(&self, function: &str, request: &CapabilityRequest) -> Result<()> {
        let started = Instant::now();

        let response = self
            .client
            .post(self.invoke_url(function))
            .timeout(self.timeout)
            .header(INVOCATION_TYPE_HEADER, "Event")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(function, started, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(function, status, body));
        }

        tracing::info!(function, "Capability dispatched asynchronously");
        Ok(())
    }
}

/// Invoke synchronously, retrying transient failures under `policy`.
///
/// Not-found and validation failures are returned after the first attempt.
pub async fn invoke_with_retry(
    invoker: &dyn CapabilityInvoker,
    policy: &RetryPolicy,
    function: &str,
    request: &CapabilityRequest,
) -> Result<CapabilityResponse> {
    retry_transient(policy, function, || invoker.invoke(function, request)).await
}
