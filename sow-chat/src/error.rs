//! Error types for the `sow-chat` crate.

use sow_rag::RagError;
use thiserror::Error;

/// Errors that abort a chat turn or startup.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid settings or a missing credential.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The completion service failed, timed out, or was rate limited.
    #[error("Completion error ({provider}): {message}")]
    CompletionService {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A recognized document format whose contents could not be read.
    #[error("Extraction error ({file}): {message}")]
    Extraction {
        /// Name of the offending file.
        file: String,
        /// A description of the failure.
        message: String,
    },

    /// Reading or writing a local file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Retrieval failed.
    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ChatError {
    /// Shorthand for a [`ChatError::CompletionService`].
    pub fn completion(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CompletionService { provider: provider.into(), message: message.into() }
    }

    /// Whether this is a configuration problem, including one raised by retrieval.
    pub fn is_config(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Rag(e) => e.is_config(),
            _ => false,
        }
    }
}

/// A convenience result type for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
