//! Retrieval pipeline orchestrator.
//!
//! The [`RagPipeline`] ties chunking, index building and retrieval together
//! for one chat turn: it chunks the reference texts, builds a fresh
//! [`VectorIndex`], queries it once, and drops it. Nothing is cached between
//! calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use sow_rag::{RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! let snippets = pipeline.retrieve_context(&example_texts, "payment terms").await?;
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::chunking::FixedSizeChunker;
use crate::config::RagConfig;
use crate::document::ScoredChunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::retriever::Retriever;

/// The retrieval pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
#[derive(Debug, Clone)]
pub struct RagPipeline {
    config: RagConfig,
    chunker: FixedSizeChunker,
    retriever: Retriever,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Chunk every reference text and build one index over all chunks.
    pub async fn build_index<S: AsRef<str>>(&self, reference_texts: &[S]) -> Result<VectorIndex> {
        let chunks = self.chunker.chunk_all(reference_texts);
        debug!(
            document_count = reference_texts.len(),
            chunk_count = chunks.len(),
            "chunked reference documents"
        );
        self.retriever.build_index(chunks).await
    }

    /// Retrieve the `top_k` chunks of `reference_texts` most relevant to
    /// `query`, with scores.
    ///
    /// Returns an empty `Vec` without touching the embedding provider when
    /// there are no reference texts.
    pub async fn retrieve_scored_context<S: AsRef<str>>(
        &self,
        reference_texts: &[S],
        query: &str,
    ) -> Result<Vec<ScoredChunk>> {
        if reference_texts.is_empty() {
            debug!("no reference documents, skipping retrieval");
            return Ok(Vec::new());
        }

        let index = self.build_index(reference_texts).await?;
        let results = self.retriever.retrieve_scored(&index, query, self.config.top_k).await?;

        info!(
            document_count = reference_texts.len(),
            chunk_count = index.len(),
            result_count = results.len(),
            "retrieval completed"
        );
        Ok(results)
    }

    /// Retrieve the text of the `top_k` chunks of `reference_texts` most
    /// relevant to `query`, most relevant first.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if the embedding credential is missing
    ///   (checked before any network call) or dimensions disagree.
    /// - [`RagError::EmbeddingError`] if any embedding call fails or times out.
    pub async fn retrieve_context<S: AsRef<str>>(
        &self,
        reference_texts: &[S],
        query: &str,
    ) -> Result<Vec<String>> {
        let results = self.retrieve_scored_context(reference_texts, query).await?;
        Ok(results.into_iter().map(|r| r.chunk.text).collect())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider is required; the config defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedding provider is missing
    /// or the config is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;

        Ok(RagPipeline {
            chunker: FixedSizeChunker::from_config(&config)?,
            retriever: Retriever::new(embedding_provider).with_timeout(config.embedding_timeout),
            config,
        })
    }
}
