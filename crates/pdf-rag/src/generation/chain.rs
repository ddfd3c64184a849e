//! Question answering: embed, retrieve with MMR, prompt and generate

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, LlmProvider, VectorStoreProvider};
use crate::types::{Chunk, SourceRef};

use super::prompt::PromptBuilder;

/// A generated answer with the chunks it was conditioned on
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Retrieval-augmented answer chain
pub struct RagChain {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    retrieval: RetrievalConfig,
}

impl RagChain {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        llm: Arc<dyn LlmProvider>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            retrieval,
        }
    }

    /// Answer `question` from the indexed chunks
    ///
    /// An empty store still reaches the LLM with an empty context.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let query = self.embedder.embed(question).await?;

        let results = self
            .store
            .max_marginal_relevance_search(
                &query,
                self.retrieval.k,
                self.retrieval.fetch_k,
                self.retrieval.lambda_mult,
            )
            .await?;

        tracing::debug!("Retrieved {} chunks for question", results.len());
        for r in &results {
            tracing::debug!("  {} (distance {:.4})", r.chunk.source.format_citation(), r.distance);
        }

        let sources = results
            .iter()
            .map(|r| SourceRef::from_chunk(&r.chunk, r.distance))
            .collect();
        let chunks: Vec<Chunk> = results.into_iter().map(|r| r.chunk).collect();

        let context = PromptBuilder::format_docs(&chunks);
        let prompt = PromptBuilder::build_qa_prompt(question, &context);

        let answer = self.llm.generate(&prompt).await?;

        Ok(Answer {
            answer: answer.trim().to_string(),
            sources,
        })
    }
}
