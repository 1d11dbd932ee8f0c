//! Error types for the `sow-rag` crate.

use thiserror::Error;

/// Errors that can occur while chunking, indexing, or retrieving.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid parameters or a missing credential.
    ///
    /// Raised before any network call is attempted.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The embedding service failed, timed out, or returned a partial batch.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Shorthand for an [`RagError::EmbeddingError`].
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into() }
    }

    /// Whether this error is a configuration problem rather than a service failure.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
