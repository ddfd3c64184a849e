//! Answer generation: Ollama client, prompt template and the question-answering chain

pub mod chain;
pub mod ollama;
pub mod prompt;

pub use chain::{Answer, RagChain};
pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
