//! # sow-rag
//!
//! Retrieval for grounding SOW chat answers in previously uploaded example
//! documents.
//!
//! ## Overview
//!
//! - [`FixedSizeChunker`] splits raw text into overlapping, fixed-size chunks.
//! - [`EmbeddingProvider`] turns text into vectors; [`openai::OpenAIEmbeddingProvider`]
//!   calls the hosted OpenAI embeddings API.
//! - [`VectorIndex`] stores chunks with their vectors and answers exact
//!   cosine-similarity top-k queries.
//! - [`Retriever`] embeds queries (with an optional timeout) and searches an index.
//! - [`RagPipeline`] runs chunk → embed → index → retrieve once per chat turn.
//!
//! Indexes live only for the call that built them; there is no persistence
//! and no incremental update.
//!
//! ## Features
//!
//! - `openai` (default) – enables [`openai::OpenAIEmbeddingProvider`].

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod retriever;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{FixedSizeChunker, chunk_texts};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, ScoredChunk};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{VectorIndex, cosine_similarity};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
