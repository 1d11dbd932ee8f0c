//! Completion service client.
//!
//! [`CompletionClient`] is the seam between the turn handler and the hosted
//! model: one system instruction, one assembled prompt, one reply. Tests
//! inject their own implementation; [`OpenAICompletionClient`] talks to the
//! OpenAI chat completions API with `reqwest`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{ChatConfig, DEFAULT_API_BASE, DEFAULT_COMPLETION_MODEL};
use crate::error::{ChatError, Result};

const PROVIDER: &str = "OpenAI";

/// A single-shot generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction.
    pub system: String,
    /// The assembled user prompt.
    pub prompt: String,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A hosted text-generation service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short provider name used in errors and log fields.
    fn name(&self) -> &str {
        "completion"
    }

    /// Generate a reply for `request`.
    ///
    /// # Errors
    ///
    /// - [`ChatError::Config`] if no credential is configured; no request is sent.
    /// - [`ChatError::CompletionService`] on transport, service or rate-limit failures.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// A [`CompletionClient`] backed by the OpenAI chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use sow_chat::completion::{CompletionClient, CompletionRequest, OpenAICompletionClient};
///
/// let client = OpenAICompletionClient::new("sk-...").with_model("gpt-4o");
/// let reply = client.complete(&request).await?;
/// ```
pub struct OpenAICompletionClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAICompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICompletionClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &!self.api_key.is_empty())
            .finish()
    }
}

impl OpenAICompletionClient {
    /// Create a client with the given API key and the default model.
    ///
    /// An empty key is accepted here and reported on the first call.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
        }
    }

    /// Create a client from the credential, base URL and model in `config`.
    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.api_key.clone().unwrap_or_default())
            .with_base_url(&config.api_base)
            .with_model(&config.completion_model)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the first choice's text out of a response body.
fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ChatError::completion(PROVIDER, "API returned no choices"))
}

// ── CompletionClient implementation ────────────────────────────────

#[async_trait]
impl CompletionClient for OpenAICompletionClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(ChatError::Config(
                "OpenAI API key is missing; set OPENAI_API_KEY".to_string(),
            ));
        }

        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_len = request.prompt.len(),
            max_tokens = request.max_tokens,
            "requesting completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                ChatError::completion(PROVIDER, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            let message = if status == StatusCode::TOO_MANY_REQUESTS {
                format!("rate limited ({status}): {detail}")
            } else {
                format!("API returned {status}: {detail}")
            };
            return Err(ChatError::completion(PROVIDER, message));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            ChatError::completion(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        first_choice(parsed)
    }
}
