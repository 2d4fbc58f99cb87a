// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the marketplace REST API.
//!
//! Provides [`RestClient`] which handles request construction, bearer-token
//! authentication, bounded timeouts, and transient error retry for
//! idempotent operations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use dohelp_config::model::DohelpConfig;
use dohelp_core::error::DohelpError;
use dohelp_core::traits::{MarketplaceApi, PlatformAdapter};
use dohelp_core::types::{
    AdapterType, ChatMessage, ConversationId, HealthStatus, MessageId, TaskId, TaskRef, UserId,
};

use crate::wire::{ApiErrorResponse, ConversationResponse, CreateConversationRequest, SendMessageRequest};

/// HTTP client for marketplace API communication.
///
/// Manages the bearer-token authorization header, connection pooling, a
/// client-wide bounded timeout, and retry-once logic for transient errors
/// (429, 500, 503) on idempotent operations. `send_message` never retries:
/// a duplicated send is worse than leaving the compose box populated for a
/// manual retry.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    has_token: bool,
    timeout: Duration,
    max_retries: u32,
}

impl RestClient {
    /// Creates a new marketplace API client from configuration.
    ///
    /// A missing `api.bearer_token` is a valid state: task fetch proceeds
    /// unauthenticated, while conversation and message operations refuse
    /// with [`DohelpError::Unauthorized`] before any network call.
    pub fn new(config: &DohelpConfig) -> Result<Self, DohelpError> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let has_token = match config.api.bearer_token.as_deref() {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    DohelpError::Config(format!("invalid bearer token header value: {e}"))
                })?;
                headers.insert(AUTHORIZATION, value);
                true
            }
            None => false,
        };

        let timeout = Duration::from_secs(config.api.timeout_secs);
        let client = reqwest::Client::builder()
            .user_agent(config.client.user_agent.clone())
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DohelpError::Api {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            has_token,
            timeout,
            max_retries: 1,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn require_token(&self) -> Result<(), DohelpError> {
        if self.has_token {
            Ok(())
        } else {
            Err(DohelpError::Unauthorized)
        }
    }

    /// Issues a request, returning the response body text on 2xx.
    ///
    /// When `retry` is set, transient errors (429, 500, 503) are retried
    /// once after a 1-second delay. Timeouts map to [`DohelpError::Timeout`]
    /// so callers can treat them as recoverable.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        retry: bool,
    ) -> Result<String, DohelpError> {
        let url = self.endpoint(path);
        let retries = if retry { self.max_retries } else { 0 };
        let mut last_error = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                warn!(%url, attempt, "retrying request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let mut req = self.client.request(method.clone(), &url);
            if let Some(ref body) = body {
                req = req.json(body);
            }

            let response = match req.send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    return Err(DohelpError::Timeout {
                        duration: self.timeout,
                    });
                }
                Err(e) => {
                    return Err(DohelpError::Api {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            };

            let status = response.status();
            debug!(%url, status = %status, attempt, "response received");

            if status.is_success() {
                return response.text().await.map_err(|e| DohelpError::Api {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body_text = response.text().await.unwrap_or_default();

            if is_transient_error(status) && attempt < retries {
                warn!(%url, status = %status, "transient error, will retry");
                last_error = Some(api_error(status, &body_text));
                continue;
            }

            return Err(api_error(status, &body_text));
        }

        Err(last_error.unwrap_or_else(|| DohelpError::Api {
            message: "request failed after retries".into(),
            source: None,
        }))
    }

    /// Issues a request and decodes the 2xx body as JSON.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        retry: bool,
    ) -> Result<T, DohelpError> {
        let text = self.request(method, path, body, retry).await?;
        serde_json::from_str(&text).map_err(|e| DohelpError::Api {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl PlatformAdapter for RestClient {
    fn name(&self) -> &str {
        "marketplace-rest"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Api
    }

    async fn health_check(&self) -> Result<HealthStatus, DohelpError> {
        // A HEAD against the API root is enough to prove reachability.
        match self.client.head(self.endpoint("/")).send().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "marketplace API unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), DohelpError> {
        // Connection pool is released on drop.
        Ok(())
    }
}

#[async_trait]
impl MarketplaceApi for RestClient {
    async fn fetch_task(&self, task: &TaskId) -> Result<TaskRef, DohelpError> {
        self.request_json(Method::GET, &format!("/task/{task}"), None, true)
            .await
    }

    async fn create_conversation(
        &self,
        receiver: &UserId,
        task: &TaskId,
    ) -> Result<ConversationId, DohelpError> {
        self.require_token()?;
        let body = serde_json::to_value(CreateConversationRequest {
            receiver_id: receiver,
            task_id: task,
        })
        .map_err(|e| DohelpError::Internal(format!("failed to encode request: {e}")))?;

        let response: ConversationResponse = self
            .request_json(Method::POST, "/conversation", Some(body), true)
            .await?;
        Ok(response.id)
    }

    async fn fetch_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<ChatMessage>, DohelpError> {
        self.require_token()?;
        self.request_json(Method::GET, &format!("/messages/{conversation}"), None, true)
            .await
    }

    async fn send_message(
        &self,
        conversation: &ConversationId,
        body: &str,
    ) -> Result<ChatMessage, DohelpError> {
        self.require_token()?;
        let payload = serde_json::to_value(SendMessageRequest {
            conversation_id: conversation,
            body,
        })
        .map_err(|e| DohelpError::Internal(format!("failed to encode request: {e}")))?;

        // No retry: the server assigns the id, so a blind retry can double-send.
        self.request_json(Method::POST, "/message", Some(payload), false)
            .await
    }

    async fn mark_seen(&self, message: &MessageId) -> Result<(), DohelpError> {
        self.require_token()?;
        self.request(Method::POST, &format!("/message/{message}/seen"), None, true)
            .await?;
        Ok(())
    }
}

/// Builds an [`DohelpError::Api`] from a non-2xx response, preferring the
/// structured error payload when the body parses as one.
fn api_error(status: StatusCode, body: &str) -> DohelpError {
    let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        format!(
            "marketplace API error ({}): {}",
            api_err.error.code, api_err.error.message
        )
    } else {
        format!("API returned {status}: {body}")
    };
    DohelpError::Api {
        message,
        source: None,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth
/// retrying.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str, token: Option<&str>) -> RestClient {
        let mut config = DohelpConfig::default();
        config.api.base_url = base_url.to_string();
        config.api.timeout_secs = 5;
        config.api.bearer_token = token.map(String::from);
        RestClient::new(&config).unwrap()
    }

    fn message_body(id: u64, sender: &str, body: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "conversation_id": "C1",
            "sender": sender,
            "body": body,
            "created_at": "2026-08-06T12:00:00Z",
            "seen": false
        })
    }

    #[tokio::test]
    async fn fetch_task_parses_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/task/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "T1",
                "poster": 42,
                "helper": "7"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let task = client.fetch_task(&TaskId("T1".into())).await.unwrap();
        assert_eq!(task.poster, Some(UserId("42".into())));
        assert_eq!(task.helper, Some(UserId("7".into())));
    }

    #[tokio::test]
    async fn fetch_task_maps_html_error_page_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/task/T1"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("<html><body>Not Found</body></html>"),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let err = client.fetch_task(&TaskId("T1".into())).await.unwrap_err();
        assert!(matches!(err, DohelpError::Api { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn fetch_task_retries_once_on_503() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/task/T1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/task/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "T1",
                "poster": "U1",
                "helper": "U2"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), None);
        let task = client.fetch_task(&TaskId("T1".into())).await.unwrap();
        assert_eq!(task.id, TaskId("T1".into()));
    }

    #[tokio::test]
    async fn create_conversation_requires_token() {
        let client = test_client("http://127.0.0.1:9", None);
        let err = client
            .create_conversation(&UserId("U2".into()), &TaskId("T1".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DohelpError::Unauthorized));
    }

    #[tokio::test]
    async fn create_conversation_sends_bearer_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/conversation"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_json(serde_json::json!({
                "receiver_id": "U2",
                "task_id": "T1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "C1"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Some("tok-1"));
        let conv = client
            .create_conversation(&UserId("U2".into()), &TaskId("T1".into()))
            .await
            .unwrap();
        assert_eq!(conv, ConversationId("C1".into()));
    }

    #[tokio::test]
    async fn fetch_messages_parses_history() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/messages/C1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_body(1, "U2", "hi"),
                message_body(2, "U1", "hello"),
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Some("tok-1"));
        let messages = client
            .fetch_messages(&ConversationId("C1".into()))
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, MessageId("1".into()));
        assert_eq!(messages[0].sender, UserId("U2".into()));
    }

    #[tokio::test]
    async fn send_message_does_not_retry_on_500() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Some("tok-1"));
        let result = client
            .send_message(&ConversationId("C1".into()), "hello")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn send_message_returns_created_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message"))
            .and(body_json(serde_json::json!({
                "conversation_id": "C1",
                "body": "hello"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body(9, "U1", "hello")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Some("tok-1"));
        let msg = client
            .send_message(&ConversationId("C1".into()), "hello")
            .await
            .unwrap();
        assert_eq!(msg.id, MessageId("9".into()));
        assert_eq!(msg.body, "hello");
    }

    #[tokio::test]
    async fn mark_seen_posts_to_seen_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/message/9/seen"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), Some("tok-1"));
        client.mark_seen(&MessageId("9".into())).await.unwrap();
    }
}
