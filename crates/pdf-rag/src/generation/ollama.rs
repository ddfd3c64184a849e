//! Ollama HTTP client for embeddings and chat with retry logic

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Base URL without a trailing slash
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt < max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}): {}; retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::debug!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Embed a single text with the configured embedding model
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.url("/api/embeddings");
        let url = url.as_str();
        let model = self.config.embed_model.as_str();
        let client = &self.client;

        self.retry_request(move || async move {
            let response = client
                .post(url)
                .json(&EmbedRequest { model, prompt: text })
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::embedding(format!("HTTP {} - {}", status, body)));
            }

            let parsed: EmbedResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse embedding response: {}", e))
            })?;

            if parsed.embedding.is_empty() {
                return Err(Error::embedding(format!(
                    "Model '{}' returned an empty embedding",
                    model
                )));
            }

            Ok(parsed.embedding)
        })
        .await
    }

    /// Send `prompt` as a single user message to the chat model and return the reply
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let url = self.url("/api/chat");
        let url = url.as_str();
        let model = self.config.generate_model.as_str();
        let temperature = self.config.temperature;
        let client = &self.client;

        tracing::info!("Generating answer with model: {}", model);

        self.retry_request(move || async move {
            let request = ChatRequest {
                model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                stream: false,
                options: ChatOptions { temperature },
            };

            let response = client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::llm(format!("Chat failed: HTTP {} - {}", status, body)));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

            Ok(parsed.message.content)
        })
        .await
    }
}
