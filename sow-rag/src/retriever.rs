//! Query-time retrieval over a [`VectorIndex`].
//!
//! The [`Retriever`] owns the embedding provider and applies the configured
//! timeout to every embedding call, so a stalled service surfaces as
//! [`RagError::EmbeddingError`] instead of hanging the chat turn.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::document::{Chunk, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{VectorIndex, first_non_finite};

/// Builds indexes and answers top-k queries with one embedding provider.
///
/// # Example
///
/// ```rust,ignore
/// use sow_rag::{FixedSizeChunker, Retriever};
///
/// let retriever = Retriever::new(Arc::new(embedder)).with_timeout(Some(Duration::from_secs(30)));
/// let index = retriever.build_index(FixedSizeChunker::new(1000, 100)?.chunk_all(&texts)).await?;
/// let snippets = retriever.retrieve(&index, "payment milestones", 5).await?;
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Await `fut`, failing with an embedding error once `limit` elapses.
async fn bounded<T>(
    limit: Option<Duration>,
    provider: &str,
    operation: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    let Some(limit) = limit else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            error!(provider, operation, timeout = ?limit, "embedding call timed out");
            Err(RagError::embedding(provider, format!("{operation} timed out after {limit:?}")))
        }
    }
}

impl Retriever {
    /// Create a retriever with no timeout.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, timeout: None }
    }

    /// Bound every embedding call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed and index `chunks`. See [`VectorIndex::build`].
    pub async fn build_index(&self, chunks: Vec<Chunk>) -> Result<VectorIndex> {
        let embedder = self.embedder.as_ref();
        bounded(self.timeout, embedder.name(), "index build", VectorIndex::build(chunks, embedder))
            .await
    }

    /// Embed `query` and return the `k` best chunks with their scores.
    ///
    /// An empty index returns an empty `Vec` without embedding the query.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `k == 0` or the query embedding's
    ///   dimensionality differs from the index.
    /// - [`RagError::EmbeddingError`] if the query embedding fails, times
    ///   out, or holds a NaN or infinite value.
    pub async fn retrieve_scored(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }
        if index.is_empty() {
            debug!("empty index, skipping query embedding");
            return Ok(Vec::new());
        }

        let embedder = self.embedder.as_ref();
        let query_embedding =
            bounded(self.timeout, embedder.name(), "query embedding", embedder.embed(query))
                .await?;
        if let Some(component) = first_non_finite(&query_embedding) {
            error!(provider = embedder.name(), component, "query embedding is not finite");
            return Err(RagError::embedding(
                embedder.name(),
                format!("query embedding has a non-finite value at component {component}"),
            ));
        }

        let results = index.search(&query_embedding, k)?;
        debug!(k, result_count = results.len(), "retrieved chunks");
        Ok(results)
    }

    /// Embed `query` and return the text of the `k` best chunks, most
    /// relevant first.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<String>> {
        let results = self.retrieve_scored(index, query, k).await?;
        Ok(results.into_iter().map(|r| r.chunk.text).collect())
    }
}
