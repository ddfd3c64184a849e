//! Application state for the PDF question-answering server

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::RagChain;
use crate::ingestion::IngestPipeline;
use crate::providers::{
    ollama_providers, EmbeddingProvider, LlmProvider, LocalVectorStore, VectorStoreProvider,
};
use crate::retrieval::{write_atomic, VectorStore};
use crate::types::{Chunk, Document};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Embedding provider
    embedding_provider: Arc<dyn EmbeddingProvider>,
    /// LLM provider
    llm_provider: Arc<dyn LlmProvider>,
    /// Vector store for chunks
    vector_store_provider: Arc<dyn VectorStoreProvider>,
    /// Split/embed/store pipeline
    pipeline: IngestPipeline,
    /// Question-answering chain
    chain: RagChain,
    /// Document registry (persisted to disk)
    documents: DashMap<Uuid, Document>,
    /// Path to documents registry file
    documents_path: PathBuf,
    /// Serializes ingestion so duplicate detection sees every earlier upload
    ingest_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Create state backed by the configured Ollama server
    pub async fn new(config: RagConfig) -> Result<Self> {
        let (embedder, llm) = ollama_providers(&config.llm, config.embeddings.dimensions)?;
        tracing::info!(
            "Ollama providers initialized at {} (embed: {}, chat: {})",
            config.llm.base_url,
            config.llm.embed_model,
            config.llm.generate_model
        );
        Self::with_providers(config, embedder, llm).await
    }

    /// Create state with explicit embedding and LLM providers
    pub async fn with_providers(
        config: RagConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        llm_provider: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let store = VectorStore::initialize(
            &config.vector_db.storage_path,
            embedding_provider.as_ref(),
            &config.embeddings.probe_text,
            embedding_provider.dimensions(),
        )
        .await?;
        let vector_store_provider: Arc<dyn VectorStoreProvider> =
            Arc::new(LocalVectorStore::new(Arc::new(store)));

        let documents_path = config.documents_path();
        let documents = Self::load_documents(&documents_path);
        tracing::info!("Loaded {} documents from registry", documents.len());

        let pipeline = IngestPipeline::new(&config.chunking);
        let chain = RagChain::new(
            Arc::clone(&embedding_provider),
            Arc::clone(&vector_store_provider),
            Arc::clone(&llm_provider),
            config.retrieval.clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                embedding_provider,
                llm_provider,
                vector_store_provider,
                pipeline,
                chain,
                documents,
                documents_path,
                ingest_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Load documents from disk
    fn load_documents(path: &Path) -> DashMap<Uuid, Document> {
        let documents = DashMap::new();

        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<Vec<Document>>(&content) {
                    Ok(docs) => {
                        for doc in docs {
                            documents.insert(doc.id, doc);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                }
            }
        }

        documents
    }

    /// Save documents to disk
    async fn save_documents(&self) -> Result<()> {
        let content = serde_json::to_vec_pretty(&self.list_documents())?;
        let path = self.inner.documents_path.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_atomic(&path, &content)
        })
        .await
        .map_err(|e| Error::internal(format!("Registry write task failed: {}", e)))?
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get embedding provider
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedding_provider
    }

    /// Get LLM provider
    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm_provider
    }

    /// Get vector store provider
    pub fn vector_store_provider(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.inner.vector_store_provider
    }

    /// Get ingestion pipeline
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    /// Get question-answering chain
    pub fn chain(&self) -> &RagChain {
        &self.inner.chain
    }

    /// Hold while checking for duplicates and indexing a new document
    pub async fn ingest_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.inner.ingest_lock.lock().await
    }

    /// Add a document to the registry (persisted to disk)
    ///
    /// The document is not registered if the registry cannot be written.
    pub async fn add_document(&self, doc: Document) -> Result<()> {
        let id = doc.id;
        self.inner.documents.insert(id, doc);
        if let Err(e) = self.save_documents().await {
            self.inner.documents.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    /// Drop a document's chunks from the store after its registration failed
    pub async fn discard_chunks(&self, id: &Uuid) {
        let store = self.vector_store_provider();
        let result = async {
            store.delete_by_document(id).await?;
            store.save().await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to discard chunks of unregistered document {}: {}", id, e);
        }
    }

    /// Put back chunks removed by a delete that could not be completed
    async fn restore_chunks(&self, chunks: &[Chunk]) {
        if chunks.is_empty() {
            return;
        }

        let store = self.vector_store_provider();
        let result = async {
            store.insert_chunks(chunks).await?;
            store.save().await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to restore {} chunks after aborted delete: {}", chunks.len(), e);
        }
    }

    /// Get a document by ID
    pub fn get_document(&self, id: &Uuid) -> Option<Document> {
        self.inner.documents.get(id).map(|d| d.value().clone())
    }

    /// Remove a document's chunks from the store and drop it from the registry
    pub async fn delete_document(&self, id: &Uuid) -> Result<(Document, usize)> {
        let _guard = self.ingest_guard().await;

        let doc = self
            .get_document(id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        let store = self.vector_store_provider();
        let chunks = store.document_chunks(id).await?;
        let removed = store.delete_by_document(id).await?;
        if let Err(e) = store.save().await {
            self.restore_chunks(&chunks).await;
            return Err(e);
        }

        self.inner.documents.remove(id);
        if let Err(e) = self.save_documents().await {
            self.inner.documents.insert(doc.id, doc.clone());
            self.restore_chunks(&chunks).await;
            return Err(e);
        }

        tracing::info!(
            "Deleted document '{}' ({} chunks removed)",
            doc.filename,
            removed
        );
        Ok((doc, removed))
    }

    /// List all documents, oldest first
    pub fn list_documents(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        docs.sort_by(|a, b| a.ingested_at.cmp(&b.ingested_at).then(a.id.cmp(&b.id)));
        docs
    }

    /// Find a document with the same extracted-text hash
    pub fn find_by_hash(&self, content_hash: &str) -> Option<Document> {
        self.inner
            .documents
            .iter()
            .find(|entry| entry.value().content_hash == content_hash)
            .map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{test_pdf, PdfLoader};
    use crate::test_support::{MockEmbedder, MockLlm};

    fn config_in(dir: &Path) -> RagConfig {
        let mut config = RagConfig::default();
        config.vector_db.storage_path = dir.join("faiss_db");
        config.upload.upload_path = dir.join("db");
        config
    }

    async fn state_in(dir: &Path) -> AppState {
        AppState::with_providers(
            config_in(dir),
            Arc::new(MockEmbedder::default()),
            Arc::new(MockLlm::new("ok")),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_initializes_empty_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;

        assert!(dir.path().join("faiss_db").exists());
        assert_eq!(state.vector_store_provider().len().await.unwrap(), 0);
        assert!(state.list_documents().is_empty());
    }

    #[tokio::test]
    async fn test_registry_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::new("a.pdf".into(), "db/a.pdf".into(), "hash-a".into(), 10);
        let id = doc.id;

        {
            let state = state_in(dir.path()).await;
            state.add_document(doc).await.unwrap();
        }

        let state = state_in(dir.path()).await;
        assert_eq!(state.get_document(&id).unwrap().filename, "a.pdf");
        assert_eq!(state.find_by_hash("hash-a").unwrap().id, id);
        assert!(state.find_by_hash("hash-b").is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_document() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;

        let err = state.delete_document(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_from_registry() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        let doc = Document::new("a.pdf".into(), "db/a.pdf".into(), "hash-a".into(), 10);
        let id = doc.id;
        state.add_document(doc).await.unwrap();

        let (deleted, removed) = state.delete_document(&id).await.unwrap();

        assert_eq!(deleted.id, id);
        assert_eq!(removed, 0);
        assert!(state.get_document(&id).is_none());
    }

    /// Index a one-page PDF and register it
    async fn ingest(state: &AppState, text: &str) -> Document {
        let loaded = PdfLoader::load_bytes("a.pdf", &test_pdf::build_pdf(&[text])).unwrap();
        let mut doc = Document::new("a.pdf".into(), "db/a.pdf".into(), loaded.content_hash.clone(), 10);
        state
            .pipeline()
            .process(
                &mut doc,
                &loaded,
                state.embedding_provider().as_ref(),
                state.vector_store_provider().as_ref(),
            )
            .await
            .unwrap();
        state.add_document(doc.clone()).await.unwrap();
        doc
    }

    #[tokio::test]
    async fn test_registry_is_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        let doc = Document::new("a.pdf".into(), "db/a.pdf".into(), "hash-a".into(), 10);
        state.add_document(doc).await.unwrap();

        let registry = dir.path().join("faiss_db").join("documents.json");
        let saved: Vec<Document> =
            serde_json::from_slice(&fs::read(&registry).unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
        assert!(!registry.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_registry_write_unregisters_document() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        fs::create_dir_all(dir.path().join("faiss_db").join("documents.json.tmp")).unwrap();

        let doc = Document::new("a.pdf".into(), "db/a.pdf".into(), "hash-a".into(), 10);
        let id = doc.id;
        assert!(state.add_document(doc).await.is_err());

        assert!(state.get_document(&id).is_none());
        assert!(state.find_by_hash("hash-a").is_none());
    }

    #[tokio::test]
    async fn test_discard_chunks_empties_store() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        let doc = ingest(&state, "Chunks that lost their registry entry").await;

        state.discard_chunks(&doc.id).await;

        assert_eq!(state.vector_store_provider().len().await.unwrap(), 0);
        let reloaded = VectorStore::load_local(&dir.path().join("faiss_db")).unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_document_when_store_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        let doc = ingest(&state, "Chunks that must survive a failed delete").await;
        let blocker = dir.path().join("faiss_db").join("index.json.tmp");
        fs::create_dir_all(&blocker).unwrap();

        assert!(state.delete_document(&doc.id).await.is_err());

        assert!(state.get_document(&doc.id).is_some());
        let store = state.vector_store_provider();
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.document_chunks(&doc.id).await.unwrap().len(), 1);

        fs::remove_dir(&blocker).unwrap();
        let (_, removed) = state.delete_document(&doc.id).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_chunks_when_registry_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        let doc = ingest(&state, "Chunks that must survive a failed registry write").await;
        fs::create_dir_all(dir.path().join("faiss_db").join("documents.json.tmp")).unwrap();

        assert!(state.delete_document(&doc.id).await.is_err());

        assert!(state.get_document(&doc.id).is_some());
        assert_eq!(state.vector_store_provider().len().await.unwrap(), 1);
        let reloaded = VectorStore::load_local(&dir.path().join("faiss_db")).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[tokio::test]
    async fn test_store_created_with_fallback_dimensions_accepts_uploads() {
        let dir = tempfile::tempdir().unwrap();
        VectorStore::new(dir.path().join("faiss_db"), 768)
            .save_local()
            .unwrap();

        let llm = Arc::new(MockLlm::new("answer"));
        let state = AppState::with_providers(
            config_in(dir.path()),
            Arc::new(MockEmbedder::default()),
            llm.clone(),
        )
        .await
        .unwrap();

        let empty = state.chain().ask("anything indexed?").await.unwrap();
        assert_eq!(empty.answer, "answer");
        assert!(empty.sources.is_empty());

        ingest(&state, "Indexed after the embedder came back").await;
        let answered = state.chain().ask("indexed").await.unwrap();
        assert_eq!(answered.sources.len(), 1);
        assert_eq!(llm.prompts().len(), 2);
    }
}
