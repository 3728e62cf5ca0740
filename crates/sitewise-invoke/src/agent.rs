use async_trait::async_trait;
use reqwest::StatusCode;
use sitewise_core::error::{Result, SitewiseError};
use std::time::{Duration, Instant};

use crate::ports::{AgentReply, AgentRequest, IntelligentAgent};

const AGENT_FUNCTION: &str = "intelligent-agent";

/// Intelligent agent served over HTTP at `POST {endpoint}/respond`
pub struct HttpAgent {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpAgent {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl IntelligentAgent for HttpAgent {
    async fn respond(&self, request: &AgentRequest) -> Result<AgentReply> {
        let started = Instant::now();

        let response = self
            .client
            .post(format!("{}/respond", self.endpoint))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SitewiseError::CapabilityTimeout {
                        function: AGENT_FUNCTION.to_string(),
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                } else {
                    SitewiseError::AgentUnavailable {
                        reason: format!("Failed to connect to agent at {}: {}", self.endpoint, e),
                    }
                }
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(SitewiseError::Throttled { function: AGENT_FUNCTION.to_string() })
            }
            StatusCode::GATEWAY_TIMEOUT => {
                return Err(SitewiseError::CapabilityTimeout {
                    function: AGENT_FUNCTION.to_string(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(SitewiseError::AgentUnavailable {
                    reason: format!("Agent error ({}): {}", status, body),
                });
            }
        }

        response.json().await.map_err(|e| SitewiseError::AgentUnavailable {
            reason: format!("Failed to parse agent response: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> AgentRequest {
        AgentRequest {
            query: "what is the best layout here?".to_string(),
            session_id: Some("s-1".to_string()),
            project_name: None,
        }
    }

    #[tokio::test]
    async fn test_agent_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/respond"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Use an offset layout.",
                "tools_used": ["layout"]
            })))
            .mount(&server)
            .await;

        let agent = HttpAgent::new(server.uri(), Duration::from_secs(5));
        let reply = agent.respond(&request()).await.unwrap();

        assert_eq!(reply.message, "Use an offset layout.");
        assert_eq!(reply.tools_used, vec!["layout"]);
        assert!(reply.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_agent_failure_classes() {
        let server = MockServer::start().await;
        Mock::given(path("/respond"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let agent = HttpAgent::new(server.uri(), Duration::from_secs(5));
        let err = agent.respond(&request()).await.unwrap_err();
        assert!(matches!(err, SitewiseError::Throttled { .. }));

        let server = MockServer::start().await;
        Mock::given(path("/respond"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let agent = HttpAgent::new(server.uri(), Duration::from_secs(5));
        let err = agent.respond(&request()).await.unwrap_err();
        assert!(matches!(err, SitewiseError::AgentUnavailable { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_agent_timeout() {
        let server = MockServer::start().await;
        Mock::given(path("/respond"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let agent = HttpAgent::new(server.uri(), Duration::from_millis(50));
        let err = agent.respond(&request()).await.unwrap_err();
        assert!(matches!(err, SitewiseError::CapabilityTimeout { .. }));
    }
}
