//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Extracted text of one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Source identifier, usually the upload's file name or its position.
    pub id: String,
    /// The raw extracted text.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether the document has no text at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A contiguous, bounded substring of one source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk's text.
    pub text: String,
    /// Position of the source text in the chunker's input.
    pub document_index: usize,
    /// Position of this chunk within its source text.
    pub chunk_index: usize,
    /// Character offset of the chunk's first character in its source text.
    pub start: usize,
}

impl Chunk {
    /// Number of characters in the chunk.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}
