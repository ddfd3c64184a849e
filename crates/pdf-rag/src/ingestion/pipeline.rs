//! Ingestion pipeline: split loaded pages, embed the chunks and store them

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Chunk, Document};

use super::parser::LoadedPdf;
use super::splitter::RecursiveCharacterSplitter;

/// Document ingestion pipeline
pub struct IngestPipeline {
    splitter: RecursiveCharacterSplitter,
}

impl IngestPipeline {
    /// Create a new pipeline
    pub fn new(chunking: &ChunkingConfig) -> Self {
        Self {
            splitter: RecursiveCharacterSplitter::from_config(chunking),
        }
    }

    /// Split a loaded PDF into chunks attributed to `doc`
    pub fn create_chunks(&self, doc: &Document, loaded: &LoadedPdf) -> Vec<Chunk> {
        self.splitter
            .split_pages(doc.id, &doc.filename, &loaded.pages, loaded.total_pages)
    }

    /// Chunk, embed and index a loaded PDF, then persist the store
    ///
    /// Updates `doc` with page and chunk counts and returns the number of chunks stored.
    pub async fn process(
        &self,
        doc: &mut Document,
        loaded: &LoadedPdf,
        embedder: &dyn EmbeddingProvider,
        store: &dyn VectorStoreProvider,
    ) -> Result<u32> {
        let mut chunks = self.create_chunks(doc, loaded);
        doc.total_pages = loaded.total_pages;

        if chunks.is_empty() {
            return Err(Error::file_parse(&doc.filename, "PDF produced no chunks"));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        store.insert_chunks(&chunks).await?;
        if let Err(e) = store.save().await {
            if let Err(rollback) = store.delete_by_document(&doc.id).await {
                tracing::error!(
                    "Failed to remove unsaved chunks of '{}': {}",
                    doc.filename,
                    rollback
                );
            }
            return Err(e);
        }

        let chunk_count = chunks.len() as u32;
        doc.total_chunks = chunk_count;

        tracing::info!(
            "Processed '{}': {} pages, {} chunks (embedder: {}, store: {})",
            doc.filename,
            doc.total_pages,
            chunk_count,
            embedder.name(),
            store.name()
        );

        Ok(chunk_count)
    }
}
