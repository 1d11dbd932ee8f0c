//! Sliding-window document chunking.
//!
//! [`FixedSizeChunker`] cuts each text into windows of `chunk_size`
//! characters, advancing by `chunk_size - chunk_overlap` characters so that
//! consecutive chunks of one text share exactly `chunk_overlap` characters.
//! Sizes and offsets count `char`s, so a window never splits a UTF-8
//! sequence.

use crate::config::RagConfig;
use crate::document::Chunk;
use crate::error::{RagError, Result};

/// Splits text into fixed-size, overlapping chunks by character count.
///
/// # Example
///
/// ```rust
/// use sow_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(20, 5)?;
/// let chunks = chunker.chunk("The quick brown fox jumps over the lazy dog.", 0);
/// assert_eq!(chunks[0].text, "The quick brown fox ");
/// assert_eq!(chunks.len(), 3);
/// # Ok::<(), sow_rag::RagError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the chunk parameters of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum number of characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split one text into chunks, left to right.
    ///
    /// Returns an empty `Vec` for empty text. The last window is the first
    /// one that reaches the end of the text, so text no longer than
    /// `chunk_size` yields exactly one chunk.
    pub fn chunk(&self, text: &str, document_index: usize) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_count = boundaries.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::with_capacity(char_count.div_ceil(step));
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            chunks.push(Chunk {
                text: text[boundaries[start]..boundaries[end]].to_string(),
                document_index,
                chunk_index: chunks.len(),
                start,
            });
            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Split every text and concatenate the results in input order.
    ///
    /// Each chunk's `document_index` is the position of its source in `texts`.
    pub fn chunk_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Chunk> {
        texts.iter().enumerate().flat_map(|(i, text)| self.chunk(text.as_ref(), i)).collect()
    }
}

/// Chunk a set of texts with the given parameters.
///
/// Convenience wrapper around [`FixedSizeChunker::new`] and
/// [`FixedSizeChunker::chunk_all`].
pub fn chunk_texts<S: AsRef<str>>(
    texts: &[S],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    Ok(FixedSizeChunker::new(chunk_size, chunk_overlap)?.chunk_all(texts))
}
