//! Prompt template for question answering over retrieved chunks

use crate::types::Chunk;

const QA_TEMPLATE: &str = "You are an assistant for question-answering tasks. Use the following pieces of retrieved context to answer the question. If you don't know the answer, just say that you don't know.
Make sure your answer is relevant to the question and it is answered from the context only.
Question: {question}
Context: {context}
Answer:";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts with blank lines
    pub fn format_docs(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Fill the question-answering template
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        // The question slot precedes the context slot, so neither substitution can be re-expanded
        QA_TEMPLATE
            .replacen("{context}", context, 1)
            .replacen("{question}", question, 1)
    }
}
