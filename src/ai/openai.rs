//! OpenAI-compatible chat-completions client.
//!
//! Works against any endpoint speaking the OpenAI wire format. The
//! defaults target Groq.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{AIError, ChatMessage, ChatModel};
use crate::core::{retry_async, LlmConfig, RetryConfig};

/// Chat-completions provider.
pub struct OpenAICompatibleProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: Option<u32>,
    retry: RetryConfig,
}

impl OpenAICompatibleProvider {
    /// Create a provider from configuration.
    ///
    /// Reads the API key from the environment variable named by
    /// `config.api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, AIError> {
        let api_key =
            config.api_key().map_err(|_| AIError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    /// Create a provider with an explicit API key.
    pub fn with_api_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, AIError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: config.retry_config(),
        })
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The model this provider sends requests to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Make a single request to the chat-completions endpoint.
    async fn request(&self, messages: &[ChatMessage]) -> Result<String, AIError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Err(AIError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AIError::ApiError { status: status.as_u16(), message: body });
        }

        let response: CompletionResponse = response.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AIError::NoResponse)
    }
}

#[async_trait]
impl ChatModel for OpenAICompatibleProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AIError> {
        tracing::debug!(model = %self.model, messages = messages.len(), "Requesting completion");

        let reply = retry_async(&self.retry, || self.request(messages), AIError::retry_delay).await?;

        tracing::debug!(model = %self.model, chars = reply.len(), "Completion received");
        Ok(reply)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn provider(base_url: String) -> OpenAICompatibleProvider {
        let config = LlmConfig { base_url, ..Default::default() };
        OpenAICompatibleProvider::with_api_key(&config, "test-key").unwrap().with_retry(
            RetryConfig { initial_delay: Duration::ZERO, ..RetryConfig::api() },
        )
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [ChatMessage::user("hello")];
        let request = CompletionRequest {
            model: "llama3-8b-8192",
            messages: &messages,
            temperature: Some(0.3),
            max_tokens: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3-8b-8192");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer test-key");
                assert_eq!(body["messages"][0]["content"], "hi");
                Json(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": "**Project Overview**" } }]
                }))
            }),
        );
        let provider = provider(spawn(router).await);

        let reply = provider.complete(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(reply, "**Project Overview**");
    }

    #[tokio::test]
    async fn test_empty_choices_is_no_response() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({ "choices": [] })) }),
        );
        let provider = provider(spawn(router).await);

        let err = provider.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AIError::NoResponse));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::UNAUTHORIZED, "invalid api key")
                }
            }),
        );
        let provider = provider(spawn(router).await);

        let err = provider.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AIError::ApiError { status: 401, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_after_header_wait() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "1")], Json(serde_json::json!({})))
                            .into_response()
                    } else {
                        Json(serde_json::json!({
                            "choices": [{ "message": { "content": "ok" } }]
                        }))
                        .into_response()
                    }
                }
            }),
        );
        let provider = provider(spawn(router).await);

        let started = std::time::Instant::now();
        let reply = provider.complete(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    #[serial_test::serial]
    fn test_missing_key_is_reported() {
        let config =
            LlmConfig { api_key_env: "PROPOSAL_AGENT_MISSING_KEY".to_string(), ..Default::default() };
        std::env::remove_var("PROPOSAL_AGENT_MISSING_KEY");

        let err = OpenAICompatibleProvider::from_config(&config).err().unwrap();
        assert!(matches!(err, AIError::MissingApiKey(name) if name == "PROPOSAL_AGENT_MISSING_KEY"));
    }
}
