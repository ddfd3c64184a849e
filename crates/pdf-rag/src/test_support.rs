//! Deterministic provider doubles for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};

/// Embeds text as letter counts folded into `DIMENSIONS` buckets
#[derive(Default)]
pub struct MockEmbedder {
    fail: bool,
}

impl MockEmbedder {
    pub const DIMENSIONS: usize = 8;

    /// An embedder whose every call fails like an unreachable backend
    pub fn failing() -> Self {
        Self { fail: true }
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; Self::DIMENSIONS];
        for b in text.bytes().filter(u8::is_ascii_alphabetic) {
            v[(b.to_ascii_lowercase() - b'a') as usize % Self::DIMENSIONS] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::embedding("connection refused"));
        }
        Ok(Self::vector_for(text))
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Returns a canned answer and records every prompt it receives
pub struct MockLlm {
    answer: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail {
            return Err(Error::llm("model not loaded"));
        }
        Ok(self.answer.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
