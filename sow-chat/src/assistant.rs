//! Turn handling for the SOW advisor.
//!
//! [`SowAssistant::handle_turn`] answers the pending user message of a
//! [`Conversation`]: it retrieves relevant chunks from the example SOWs,
//! assembles the prompt, and calls the completion service. The
//! conversation is passed in and returned by value; on any error it comes
//! back without an assistant message.

use std::sync::Arc;

use sow_rag::openai::OpenAIEmbeddingProvider;
use sow_rag::{Document, EmbeddingProvider, RagPipeline};
use tracing::{error, info, instrument};

use crate::completion::{CompletionClient, CompletionRequest, OpenAICompletionClient};
use crate::config::ChatConfig;
use crate::conversation::Conversation;
use crate::error::{ChatError, Result};
use crate::prompt::PromptContext;

/// Reference documents for a turn: an optional SOW template plus example
/// SOWs to retrieve from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    pub template: Option<Document>,
    pub examples: Vec<Document>,
}

impl ReferenceSet {
    /// Split uploads by the "first upload is the template" convention.
    pub fn from_uploads(uploads: Vec<Document>) -> Self {
        let mut uploads = uploads.into_iter();
        Self { template: uploads.next(), examples: uploads.collect() }
    }

    /// Text of the template, or empty.
    pub fn template_text(&self) -> &str {
        self.template.as_ref().map_or("", |d| d.text.as_str())
    }

    /// Texts of the example documents, in upload order.
    pub fn example_texts(&self) -> Vec<&str> {
        self.examples.iter().map(|d| d.text.as_str()).collect()
    }
}

/// Everything a turn can draw on besides the user's message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnInputs {
    pub references: ReferenceSet,
    /// Draft SOWs, requirements, or other input documents.
    pub input_documents: Vec<Document>,
}

impl TurnInputs {
    /// Input document texts joined with newlines.
    pub fn input_content(&self) -> String {
        self.input_documents.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

/// The result of [`SowAssistant::handle_turn`].
#[derive(Debug)]
pub struct TurnOutcome {
    /// The conversation, with the assistant reply appended on success.
    pub conversation: Conversation,
    /// The reply, `Ok(None)` if nothing was pending.
    pub reply: Result<Option<String>>,
}

/// The SOW advisor: retrieval plus one completion call per turn.
pub struct SowAssistant {
    config: ChatConfig,
    pipeline: RagPipeline,
    completion: Arc<dyn CompletionClient>,
}

impl std::fmt::Debug for SowAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SowAssistant")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("completion", &self.completion.name())
            .finish()
    }
}

impl SowAssistant {
    /// Assemble an assistant from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if `config` is invalid.
    pub fn new(
        config: ChatConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionClient>,
    ) -> Result<Self> {
        config.validate()?;
        let pipeline =
            RagPipeline::builder().config(config.rag.clone()).embedding_provider(embedder).build()?;
        Ok(Self { config, pipeline, completion })
    }

    /// Wire the OpenAI embedding and completion clients from `config`.
    pub fn from_config(config: ChatConfig) -> Result<Self> {
        let embedder = OpenAIEmbeddingProvider::new(config.api_key.clone().unwrap_or_default())
            .with_base_url(&config.api_base)
            .with_model(&config.embedding_model);
        let completion = OpenAICompletionClient::from_config(&config);
        Self::new(config, Arc::new(embedder), Arc::new(completion))
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Answer the conversation's pending user message, if any.
    pub async fn handle_turn(
        &self,
        mut conversation: Conversation,
        inputs: &TurnInputs,
    ) -> TurnOutcome {
        let Some(prompt) = conversation.pending_prompt().map(str::to_owned) else {
            return TurnOutcome { conversation, reply: Ok(None) };
        };

        match self.respond(&prompt, inputs).await {
            Ok(reply) => {
                conversation.push_assistant(reply.clone());
                TurnOutcome { conversation, reply: Ok(Some(reply)) }
            }
            Err(e) => {
                error!(error = %e, "turn failed, no reply recorded");
                TurnOutcome { conversation, reply: Err(e) }
            }
        }
    }

    /// Retrieve context, assemble the prompt, and generate a reply to `prompt`.
    ///
    /// # Errors
    ///
    /// - [`ChatError::Config`] or [`ChatError::Rag`] with a configuration
    ///   error when a credential is missing.
    /// - [`ChatError::Rag`] with an embedding error if retrieval fails.
    /// - [`ChatError::CompletionService`] if generation fails or times out.
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn respond(&self, prompt: &str, inputs: &TurnInputs) -> Result<String> {
        let input_content = inputs.input_content();
        let query = if input_content.is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt}\n{input_content}")
        };

        let retrieved =
            self.pipeline.retrieve_context(&inputs.references.example_texts(), &query).await?;

        let rendered = PromptContext {
            template: inputs.references.template_text(),
            retrieved: &retrieved,
            input: &input_content,
            request: prompt,
        }
        .render();

        let request = CompletionRequest {
            system: self.config.system_instruction.clone(),
            prompt: rendered,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let reply = self.complete(&request).await?;

        info!(retrieved_count = retrieved.len(), reply_len = reply.len(), "turn answered");
        Ok(reply)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let provider = self.completion.name();
        let Some(limit) = self.config.completion_timeout else {
            return self.completion.complete(request).await;
        };
        match tokio::time::timeout(limit, self.completion.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                error!(provider, timeout = ?limit, "completion timed out");
                Err(ChatError::completion(provider, format!("timed out after {limit:?}")))
            }
        }
    }
}

