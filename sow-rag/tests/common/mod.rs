//! Deterministic embedding providers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sow_rag::{EmbeddingProvider, RagError, Result};

/// Bag-of-words embedder over a fixed vocabulary: one dimension per word,
/// holding that word's count in the text.
#[derive(Default)]
pub struct VocabularyEmbedder {
    vocabulary: Vec<String>,
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub fn new(words: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            vocabulary: words.iter().map(|w| w.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst) + self.single_calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.vocabulary.len()];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let token = token.to_lowercase();
            if let Some(i) = self.vocabulary.iter().position(|w| *w == token) {
                v[i] += 1.0;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for VocabularyEmbedder {
    fn name(&self) -> &str {
        "vocabulary"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Reports a missing credential and counts any embedding attempt.
#[derive(Default)]
pub struct NoCredentialEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for NoCredentialEmbedder {
    fn ensure_credentials(&self) -> Result<()> {
        Err(RagError::ConfigError("API key is missing".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1.0])
    }

    fn dimensions(&self) -> usize {
        1
    }
}

/// Fails every embedding call with a service error.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::embedding("failing", "service unavailable"))
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Returns one vector fewer than requested for batches.
pub struct ShortBatchEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortBatchEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Embeds documents in three dimensions but queries in two.
pub struct MismatchedQueryEmbedder;

#[async_trait]
impl EmbeddingProvider for MismatchedQueryEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        3
    }
}

/// Sleeps before answering.
pub struct SlowEmbedder {
    pub delay: Duration,
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    fn name(&self) -> &str {
        "slow"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Emits a NaN component either in the second batch vector or in every
/// query vector.
pub struct NonFiniteEmbedder {
    pub in_batch: bool,
}

#[async_trait]
impl EmbeddingProvider for NonFiniteEmbedder {
    fn name(&self) -> &str {
        "non-finite"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.in_batch { Ok(vec![1.0, 0.0]) } else { Ok(vec![f32::NAN, 0.0]) }
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let poisoned = if self.in_batch { Some(1) } else { None };
        Ok((0..texts.len())
            .map(|i| if Some(i) == poisoned { vec![f32::NAN, 0.0] } else { vec![1.0, 0.0] })
            .collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}
