//! Local vector store provider backed by the flat index on disk

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::retrieval::{SearchResult, VectorStore};
use crate::types::Chunk;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Local vector store wrapping `VectorStore`
///
/// Index work and file writes run on the blocking pool.
pub struct LocalVectorStore {
    store: Arc<VectorStore>,
}

impl LocalVectorStore {
    /// Create from existing VectorStore
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }

    /// Get underlying store for direct access
    pub fn inner(&self) -> &Arc<VectorStore> {
        &self.store
    }
}

fn into_provider_results(results: Vec<SearchResult>) -> Vec<VectorSearchResult> {
    results
        .into_iter()
        .map(|r| VectorSearchResult {
            chunk: r.chunk,
            distance: r.distance,
        })
        .collect()
}

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::Internal(format!("Task join error: {}", e))
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let store = self.store.clone();
        let chunks = chunks.to_vec();
        tokio::task::spawn_blocking(move || store.add_chunks(&chunks).map(|_| ()))
            .await
            .map_err(join_error)?
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>> {
        let store = self.store.clone();
        let query = query_embedding.to_vec();
        tokio::task::spawn_blocking(move || {
            store
                .similarity_search_by_vector(&query, top_k)
                .map(into_provider_results)
        })
        .await
        .map_err(join_error)?
    }

    async fn max_marginal_relevance_search(
        &self,
        query_embedding: &[f32],
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<VectorSearchResult>> {
        let store = self.store.clone();
        let query = query_embedding.to_vec();
        tokio::task::spawn_blocking(move || {
            store
                .max_marginal_relevance_search_by_vector(&query, k, fetch_k, lambda_mult)
                .map(into_provider_results)
        })
        .await
        .map_err(join_error)?
    }

    async fn document_chunks(&self, document_id: &Uuid) -> Result<Vec<Chunk>> {
        Ok(self.store.document_chunks(document_id))
    }

    async fn delete_by_document(&self, document_id: &Uuid) -> Result<usize> {
        let store = self.store.clone();
        let doc_id = *document_id;
        tokio::task::spawn_blocking(move || Ok(store.delete_document(&doc_id)))
            .await
            .map_err(join_error)?
    }

    async fn save(&self) -> Result<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save_local())
            .await
            .map_err(join_error)?
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.store.len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.store.storage_path().exists())
    }

    fn name(&self) -> &str {
        "local-flat-l2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkSource;

    fn chunk(doc: Uuid, text: &str, embedding: Vec<f32>) -> Chunk {
        let mut c = Chunk::new(doc, text.to_string(), ChunkSource::pdf("a.pdf".into(), 1, 1), 0);
        c.embedding = embedding;
        c
    }

    #[tokio::test]
    async fn test_provider_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        let provider = LocalVectorStore::new(Arc::new(VectorStore::new(&path, 2)));
        let (keep, gone) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(provider.is_empty().await.unwrap());
        provider
            .insert_chunks(&[
                chunk(keep, "x axis", vec![1.0, 0.0]),
                chunk(gone, "y axis", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        assert_eq!(provider.len().await.unwrap(), 2);

        let nearest = provider.similarity_search(&[0.1, 0.9], 1).await.unwrap();
        assert_eq!(nearest[0].chunk.content, "y axis");

        let mmr = provider
            .max_marginal_relevance_search(&[1.0, 0.1], 2, 10, 0.5)
            .await
            .unwrap();
        assert_eq!(mmr.len(), 2);
        assert_eq!(mmr[0].chunk.content, "x axis");

        assert_eq!(provider.delete_by_document(&gone).await.unwrap(), 1);
        provider.save().await.unwrap();
        assert!(provider.health_check().await.unwrap());

        let reloaded = VectorStore::load_local(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(provider.inner().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_wrong_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalVectorStore::new(Arc::new(VectorStore::new(dir.path(), 3)));
        let doc = Uuid::new_v4();
        provider
            .insert_chunks(&[chunk(doc, "full", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let err = provider
            .insert_chunks(&[chunk(Uuid::new_v4(), "short", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorStore(_)));
        assert_eq!(provider.len().await.unwrap(), 1);
        assert_eq!(provider.document_chunks(&doc).await.unwrap()[0].embedding, vec![1.0, 0.0, 0.0]);
    }
}
