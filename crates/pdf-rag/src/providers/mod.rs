//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Handlers talk to these traits so the Ollama-backed implementations can be swapped
//! for test doubles or other backends.

pub mod embedding;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use local::LocalVectorStore;
pub use ollama::{ollama_providers, OllamaEmbedder, OllamaLlm};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
