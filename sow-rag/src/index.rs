//! Immutable in-memory vector index with exact cosine-similarity search.
//!
//! A [`VectorIndex`] is built once from a set of chunks, queried any number
//! of times, and then dropped. There is no insert or delete after
//! construction. Search is a linear scan over every entry, which is exact
//! and fast enough for the tens to hundreds of chunks a chat turn produces.

use tracing::{debug, error, info};

use crate::document::{Chunk, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Chunks paired with their embeddings, searchable by cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

/// Compute cosine similarity between two vectors of equal length.
///
/// Equivalent to the dot product of the L2-normalized vectors.
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Position of the first NaN or infinite component, if any.
pub(crate) fn first_non_finite(vector: &[f32]) -> Option<usize> {
    vector.iter().position(|x| !x.is_finite())
}

/// Check that there is one finite vector per chunk and that all vectors
/// share one non-zero length. Returns that length.
fn check_shape(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> std::result::Result<usize, String> {
    if embeddings.len() != chunks.len() {
        return Err(format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()));
    }
    let dimensions = embeddings.first().map_or(0, Vec::len);
    if dimensions == 0 {
        return Err("embeddings must not be empty".to_string());
    }
    if let Some(pos) = embeddings.iter().position(|e| e.len() != dimensions) {
        return Err(format!(
            "embedding {pos} has {} dimensions, expected {dimensions}",
            embeddings[pos].len()
        ));
    }
    if let Some((pos, component)) =
        embeddings.iter().enumerate().find_map(|(i, e)| first_non_finite(e).map(|c| (i, c)))
    {
        return Err(format!("embedding {pos} has a non-finite value at component {component}"));
    }
    Ok(dimensions)
}

impl VectorIndex {
    /// Embed every chunk and index the results.
    ///
    /// The credential check runs before any embedding call. All chunk texts
    /// go to the provider in one order-preserving
    /// [`embed_batch`](EmbeddingProvider::embed_batch) call. An empty chunk
    /// list yields an empty index without calling the provider.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if the provider has no credential.
    /// - [`RagError::EmbeddingError`] if the provider fails or returns a
    ///   batch whose shape does not match the chunks or that holds NaN or
    ///   infinite values. No partial index is returned.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        embedder.ensure_credentials()?;

        if chunks.is_empty() {
            debug!(provider = embedder.name(), "no chunks to index");
            return Ok(Self::default());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
            error!(
                provider = embedder.name(),
                chunk_count = texts.len(),
                error = %e,
                "embedding failed during index build"
            );
            e
        })?;

        let dimensions = check_shape(&chunks, &embeddings).map_err(|message| {
            error!(provider = embedder.name(), %message, "embedding batch does not match chunks");
            RagError::embedding(embedder.name(), message)
        })?;

        let index = Self::assemble(chunks, embeddings, dimensions);
        info!(provider = embedder.name(), chunk_count = index.len(), dimensions, "index built");
        Ok(index)
    }

    /// Index chunks with embeddings computed elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the number of embeddings differs
    /// from the number of chunks, the embeddings differ in length, or any
    /// value is not finite.
    pub fn from_parts(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.is_empty() && embeddings.is_empty() {
            return Ok(Self::default());
        }
        let dimensions = check_shape(&chunks, &embeddings).map_err(RagError::ConfigError)?;
        Ok(Self::assemble(chunks, embeddings, dimensions))
    }

    fn assemble(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>, dimensions: usize) -> Self {
        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();
        Self { entries, dimensions }
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of every stored vector, or 0 for an empty index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Indexed chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Return the `k` chunks most similar to `query_embedding`.
    ///
    /// Results are ordered by descending cosine similarity; equal scores
    /// keep insertion order. If `k` exceeds the number of chunks, all of
    /// them are returned. An empty index returns an empty `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `k == 0`, the query vector's
    /// length differs from [`dimensions`](Self::dimensions), or the query
    /// holds a NaN or infinite value.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query_embedding.len() != self.dimensions {
            return Err(RagError::ConfigError(format!(
                "query embedding has {} dimensions but the index has {}",
                query_embedding.len(),
                self.dimensions
            )));
        }
        if let Some(component) = first_non_finite(query_embedding) {
            return Err(RagError::ConfigError(format!(
                "query embedding has a non-finite value at component {component}"
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, query_embedding)))
            .collect();

        // `sort_by` is stable, so ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }
}
