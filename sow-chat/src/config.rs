//! Chat assistant configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sow_rag::RagConfig;

use crate::error::{ChatError, Result};
use crate::prompt::SYSTEM_INSTRUCTION;

/// The default OpenAI API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// The default completion model.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4-turbo";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Settings for the completion call, the embedding call and retrieval.
///
/// The API key is never serialized.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Credential for both the embedding and completion services.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Model used for chat completions.
    pub completion_model: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Maximum number of tokens generated per reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on each completion call. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timeout: Option<Duration>,
    /// System message sent with every completion request.
    pub system_instruction: String,
    /// Chunking and retrieval settings.
    pub rag: RagConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            max_tokens: 2000,
            temperature: 0.2,
            completion_timeout: Some(Duration::from_secs(120)),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            rag: RagConfig::default(),
        }
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("completion_model", &self.completion_model)
            .field("embedding_model", &self.embedding_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("completion_timeout", &self.completion_timeout)
            .field("rag", &self.rag)
            .finish_non_exhaustive()
    }
}

impl ChatConfig {
    /// Read settings from the process environment.
    ///
    /// | variable | field |
    /// |----------|-------|
    /// | `OPENAI_API_KEY` | `api_key` |
    /// | `OPENAI_BASE_URL` | `api_base` |
    /// | `SOW_CHAT_MODEL` | `completion_model` |
    /// | `SOW_CHAT_EMBEDDING_MODEL` | `embedding_model` |
    ///
    /// Unset or empty variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: var("OPENAI_API_KEY"),
            api_base: var("OPENAI_BASE_URL").unwrap_or(defaults.api_base),
            completion_model: var("SOW_CHAT_MODEL").unwrap_or(defaults.completion_model),
            embedding_model: var("SOW_CHAT_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            ..defaults
        }
    }

    /// Whether a non-empty API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Check generation and retrieval parameters.
    ///
    /// A missing API key is not an error here; it is reported by the first
    /// call that needs it.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(ChatError::Config("max_tokens must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ChatError::Config(format!(
                "temperature ({}) must be between 0 and 2",
                self.temperature
            )));
        }
        self.rag.validate()?;
        Ok(())
    }
}
