//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::Chunk;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Squared L2 distance to the query (lower is closer)
    pub distance: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorStore`: flat L2 index persisted to a local directory
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert embedded chunks
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Nearest chunks by distance
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>>;

    /// Maximal-marginal-relevance search over the `fetch_k` nearest chunks
    async fn max_marginal_relevance_search(
        &self,
        query_embedding: &[f32],
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<VectorSearchResult>>;

    /// All chunks of a document, embeddings included
    async fn document_chunks(&self, document_id: &Uuid) -> Result<Vec<Chunk>>;

    /// Delete all chunks for a document
    async fn delete_by_document(&self, document_id: &Uuid) -> Result<usize>;

    /// Persist the current contents
    async fn save(&self) -> Result<()>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
