//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for chat-model text generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2:1b by default)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a fully rendered prompt as a single user message and return the reply text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
