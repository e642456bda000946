//! The provider-facing client — one type that can talk to every supported
//! backend.
//!
//! [`CompletionBackend`] is the seam the pipeline crate builds against;
//! [`ProviderClient`] is its production implementation. Tests substitute a
//! fake backend, so the orchestration logic never needs a socket.

use async_trait::async_trait;
use tracing::{debug, error};

use tweetforge_core::error::GenerationError;
use tweetforge_core::types::ChatMessage;

use crate::auth::auth_header;
use crate::registry::ProviderSpec;
use crate::request::{build_body, parse_completion};
use crate::sse::{delta_stream, one_shot};
use crate::transport::{execute, RetryPolicy};

pub use crate::sse::DeltaStream;

// ─────────────────────────────────────────────
// Backend trait
// ─────────────────────────────────────────────

/// Per-call generation settings.
#[derive(Clone, Copy, Debug)]
pub struct CompletionOpts {
    pub temperature: f64,
    pub max_tokens: u32,
    /// Route to the provider's vision-capable model.
    pub vision: bool,
}

impl Default for CompletionOpts {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 1024,
            vision: false,
        }
    }
}

/// The seam between the pipeline and the network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One full (non-streaming) completion.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOpts,
    ) -> Result<String, GenerationError>;

    /// A completion as a delta stream. Implementations without streaming
    /// support deliver the whole answer as a single terminal delta.
    async fn stream(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOpts,
    ) -> Result<DeltaStream, GenerationError>;

    /// Display name for logs and error strings.
    fn display_name(&self) -> &str;
}

// ─────────────────────────────────────────────
// ProviderClient
// ─────────────────────────────────────────────

/// HTTP client bound to one provider spec and one credential.
pub struct ProviderClient {
    client: reqwest::Client,
    spec: &'static ProviderSpec,
    credential: String,
    /// Endpoint override (config `apiBase` or a test server).
    endpoint_override: Option<String>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider", &self.spec.display_name)
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

impl ProviderClient {
    pub fn new(spec: &'static ProviderSpec, credential: impl Into<String>) -> Self {
        ProviderClient {
            client: reqwest::Client::new(),
            spec,
            credential: credential.into(),
            endpoint_override: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the endpoint URL (config `apiBase`, mock servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn spec(&self) -> &'static ProviderSpec {
        self.spec
    }

    fn endpoint(&self) -> &str {
        self.endpoint_override.as_deref().unwrap_or(self.spec.endpoint)
    }

    /// Send one completion request (retried) and return the raw response
    /// once its status is final.
    async fn send(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOpts,
        stream: bool,
    ) -> Result<reqwest::Response, GenerationError> {
        let model = self.spec.model_for(opts.vision);
        let body = build_body(
            self.spec.body,
            model,
            messages,
            opts.temperature,
            opts.max_tokens,
            stream,
        );
        let (header_name, header_value) = auth_header(self.spec, &self.credential)?;
        let url = self.endpoint().to_string();

        debug!(
            provider = self.spec.display_name,
            model,
            stream,
            messages = messages.len(),
            "calling provider"
        );

        let response = execute(
            || {
                self.client
                    .post(&url)
                    .header(header_name, header_value.clone())
                    .json(&body)
            },
            self.retry,
            None,
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            error!(
                provider = self.spec.display_name,
                status = %status,
                body = %body_text,
                "provider API error"
            );
            return Err(GenerationError::transport(
                self.spec.display_name,
                status.as_u16(),
                &body_text,
            ));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for ProviderClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOpts,
    ) -> Result<String, GenerationError> {
        let response = self.send(messages, opts, false).await?;
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        parse_completion(self.spec.body, &value).ok_or_else(|| {
            error!(
                provider = self.spec.display_name,
                "2xx response without extractable content"
            );
            GenerationError::Parse
        })
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOpts,
    ) -> Result<DeltaStream, GenerationError> {
        if !self.spec.supports_streaming {
            let full = self.complete(messages, opts).await?;
            return Ok(one_shot(full));
        }

        let response = self.send(messages, opts, true).await?;
        Ok(delta_stream(response))
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::find_by_id;
    use futures::StreamExt;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .and(header("Authorization", "Bearer gsk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "Tip! #React" } }]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(find_by_id("groq").unwrap(), "gsk-test")
            .with_endpoint(format!("{}/v1/chat", server.uri()));

        let messages = vec![ChatMessage::user("React tips")];
        let content = client
            .complete(&messages, &CompletionOpts::default())
            .await
            .unwrap();

        assert_eq!(content, "Tip! #React");
    }

    #[tokio::test]
    async fn test_complete_api_error_becomes_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"error":{"message":"bad key"}}"#),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::new(find_by_id("groq").unwrap(), "bad")
            .with_endpoint(server.uri())
            .with_retry(fast_retry());

        let err = client
            .complete(&[ChatMessage::user("x")], &CompletionOpts::default())
            .await
            .unwrap_err();

        match err {
            GenerationError::Transport { status, .. } => assert_eq!(status, 401),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_unusable_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::new(find_by_id("deepseek").unwrap(), "sk-ds")
            .with_endpoint(server.uri());

        let err = client
            .complete(&[ChatMessage::user("x")], &CompletionOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse));
    }

    #[tokio::test]
    async fn test_stream_decodes_sse_deltas_in_order() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::new(find_by_id("groq").unwrap(), "gsk-test")
            .with_endpoint(server.uri());

        let mut stream = client
            .stream(&[ChatMessage::user("hi")], &CompletionOpts::default())
            .await
            .unwrap();

        let mut collected = String::new();
        while let Some(delta) = stream.next().await {
            collected.push_str(&delta.unwrap());
        }
        assert_eq!(collected, "Hello");
    }

    #[tokio::test]
    async fn test_non_streaming_provider_yields_single_delta() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-goog-api-key", "AIza-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "full answer" }] } }]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(find_by_id("gemini").unwrap(), "AIza-test")
            .with_endpoint(server.uri());

        let mut stream = client
            .stream(&[ChatMessage::user("hi")], &CompletionOpts::default())
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, "full answer");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_vision_opt_switches_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "model": "glm-4v-flash"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "a photo" } }]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(find_by_id("zhipu").unwrap(), "id.secret")
            .with_endpoint(server.uri());

        let opts = CompletionOpts {
            vision: true,
            ..Default::default()
        };
        let content = client
            .complete(&[ChatMessage::user("describe")], &opts)
            .await
            .unwrap();
        assert_eq!(content, "a photo");
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "recovered" } }]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(find_by_id("openrouter").unwrap(), "sk-or")
            .with_endpoint(server.uri())
            .with_retry(fast_retry());

        let content = client
            .complete(&[ChatMessage::user("x")], &CompletionOpts::default())
            .await
            .unwrap();
        assert_eq!(content, "recovered");
    }
}
