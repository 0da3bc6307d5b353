use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{ChatBackend, HealthOutcome};
use crate::error::{ChatError, ConnectivityError};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    api_ready: bool,
    status: String,
}

/// [`ChatBackend`] speaking JSON over HTTP to a fixed origin.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for HttpGateway {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn check_health(&self) -> HealthOutcome {
        let url = format!("{}/api/health", self.base_url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "health probe got no response");
                return HealthOutcome::Unreachable(ConnectivityError::Network {
                    base_url: self.base_url.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "health probe rejected");
            return HealthOutcome::Unreachable(ConnectivityError::BadStatus(status.as_u16()));
        }

        match response.json::<HealthResponse>().await {
            Ok(health) if health.api_ready => {
                debug!(status = %health.status, "backend ready");
                HealthOutcome::Ready
            }
            Ok(health) => HealthOutcome::NotReady(health.status),
            Err(e) => {
                warn!(error = %e, "health body is not a readiness report");
                HealthOutcome::Unreachable(ConnectivityError::Malformed(e.to_string()))
            }
        }
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn send_chat(&self, text: &str) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest { message: text };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            warn!(%status, detail = ?detail, "chat request failed");
            return Err(ChatError::RequestFailed {
                status: status.as_u16(),
                detail,
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

        debug!(status = ?reply.status, "chat reply received");
        Ok(reply.response)
    }
}

/// Pull a non-empty string `detail` out of an error body, if there is one.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|detail| detail.as_str())
        .filter(|detail| !detail.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_reads_string_field() {
        assert_eq!(
            error_detail(r#"{"detail":"quota exceeded"}"#),
            Some("quota exceeded".to_string())
        );
    }

    #[test]
    fn test_error_detail_ignores_unusable_bodies() {
        assert_eq!(error_detail("<html>Bad Gateway</html>"), None);
        assert_eq!(error_detail(r#"{"error":"nope"}"#), None);
        assert_eq!(error_detail(r#"{"detail":""}"#), None);
        // Validation errors carry a list, not a message.
        assert_eq!(error_detail(r#"{"detail":[{"msg":"field required"}]}"#), None);
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let gateway = HttpGateway::new("http://localhost:8000/");
        assert_eq!(gateway.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_chat_request_shape() {
        let body = serde_json::to_value(ChatRequest { message: "Where to in June?" }).unwrap();
        assert_eq!(body, serde_json::json!({"message": "Where to in June?"}));
    }
}
