//! Ollama-based providers for embeddings and chat generation
//!
//! Both providers can share one `OllamaClient` so they reuse its connection pool.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::generation::OllamaClient;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
    model: String,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder with its own client
    pub fn new(config: &LlmConfig, dimensions: usize) -> Result<Self> {
        Ok(Self::from_client(
            Arc::new(OllamaClient::new(config)?),
            dimensions,
            config.embed_model.clone(),
        ))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize, model: String) -> Self {
        Self {
            client,
            dimensions,
            model,
        }
    }

    /// Embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama chat provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider with its own client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self::from_client(
            Arc::new(OllamaClient::new(config)?),
            config.generate_model.clone(),
        ))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.chat(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build an embedder and chat provider sharing one client
pub fn ollama_providers(
    config: &LlmConfig,
    dimensions: usize,
) -> Result<(Arc<OllamaEmbedder>, Arc<OllamaLlm>)> {
    let client = Arc::new(OllamaClient::new(config)?);
    let embedder = OllamaEmbedder::from_client(
        Arc::clone(&client),
        dimensions,
        config.embed_model.clone(),
    );
    let llm = OllamaLlm::from_client(client, config.generate_model.clone());
    Ok((Arc::new(embedder), Arc::new(llm)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providers_share_config() {
        let config = LlmConfig::default();
        let (embedder, llm) = ollama_providers(&config, 768).unwrap();

        assert_eq!(embedder.dimensions(), 768);
        assert_eq!(embedder.model(), "nomic-embed-text");
        assert_eq!(EmbeddingProvider::name(embedder.as_ref()), "ollama");
        assert_eq!(llm.model(), "llama3.2:1b");
    }

    #[tokio::test]
    async fn test_health_check_unreachable_is_false() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let llm = OllamaLlm::new(&config).unwrap();
        assert!(!llm.health_check().await.unwrap());
    }
}
