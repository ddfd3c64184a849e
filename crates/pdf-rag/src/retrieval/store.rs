//! Vector store: flat index plus an in-memory docstore, persisted as JSON

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

use super::index::FlatL2Index;
use super::mmr::maximal_marginal_relevance;

const INDEX_FILE: &str = "index.json";
const DOCSTORE_FILE: &str = "docstore.json";

/// Search result with chunk and distance
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Squared L2 distance to the query (lower is closer)
    pub distance: f32,
}

/// Chunk text and metadata, keyed by chunk ID, plus the index position mapping
#[derive(Debug, Default, Serialize, Deserialize)]
struct Docstore {
    chunks: HashMap<Uuid, Chunk>,
    index_to_docstore_id: Vec<Uuid>,
}

struct StoreInner {
    index: FlatL2Index,
    docstore: Docstore,
}

/// Persistent vector store
pub struct VectorStore {
    inner: RwLock<StoreInner>,
    storage_path: PathBuf,
}

impl VectorStore {
    /// Create an empty store saved under `storage_path`
    pub fn new(storage_path: impl Into<PathBuf>, dimensions: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                index: FlatL2Index::new(dimensions),
                docstore: Docstore::default(),
            }),
            storage_path: storage_path.into(),
        }
    }

    /// Load the store at `storage_path` if present, otherwise create and save an empty one
    ///
    /// A new store takes its dimensions from embedding `probe_text`; when the embedder
    /// is unreachable `fallback_dimensions` is used instead.
    pub async fn initialize(
        storage_path: &Path,
        embedder: &dyn EmbeddingProvider,
        probe_text: &str,
        fallback_dimensions: usize,
    ) -> Result<Self> {
        if storage_path.exists() {
            let store = Self::load_local(storage_path)?;
            tracing::info!(
                "Loaded vector store from {} ({} chunks, {} dimensions)",
                storage_path.display(),
                store.len(),
                store.dimensions()
            );
            return Ok(store);
        }

        let dimensions = match embedder.embed(probe_text).await {
            Ok(vector) if !vector.is_empty() => vector.len(),
            Ok(_) => {
                tracing::warn!("Embedder returned an empty probe vector, using {} dimensions", fallback_dimensions);
                fallback_dimensions
            }
            Err(e) => {
                tracing::warn!(
                    "Could not probe embedding dimensions ({}), using {}",
                    e,
                    fallback_dimensions
                );
                fallback_dimensions
            }
        };

        let store = Self::new(storage_path, dimensions);
        store.save_local()?;
        tracing::info!(
            "Created vector store at {} ({} dimensions)",
            storage_path.display(),
            dimensions
        );
        Ok(store)
    }

    /// Directory the store is saved to
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Embedding dimensions accepted by the index
    pub fn dimensions(&self) -> usize {
        self.inner.read().index.dimensions()
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add embedded chunks; all-or-nothing on dimension errors
    ///
    /// An empty store adopts the dimensions of the first chunk.
    pub fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut inner = self.inner.write();
        let dimensions = match chunks.first() {
            Some(first) if inner.index.is_empty() => first.embedding.len(),
            _ => inner.index.dimensions(),
        };

        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(Error::vector_store(format!("Chunk {} has no embedding", chunk.id)));
            }
            if chunk.embedding.len() != dimensions {
                return Err(Error::vector_store(format!(
                    "Chunk {} has {} dimensions, index expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    dimensions
                )));
            }
        }

        for chunk in chunks {
            inner.index.add(&chunk.embedding)?;

            let mut stored = chunk.clone();
            stored.embedding = Vec::new();
            inner.docstore.index_to_docstore_id.push(chunk.id);
            inner.docstore.chunks.insert(chunk.id, stored);
        }

        Ok(chunks.len())
    }

    /// Nearest chunks by L2 distance
    pub fn similarity_search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let inner = self.inner.read();
        let hits = inner.index.search(query, k)?;

        hits.into_iter()
            .map(|(pos, distance)| {
                Ok(SearchResult {
                    chunk: inner.chunk_at(pos)?,
                    distance,
                })
            })
            .collect()
    }

    /// Fetch `fetch_k` nearest chunks, then pick `k` of them with MMR
    pub fn max_marginal_relevance_search_by_vector(
        &self,
        query: &[f32],
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.inner.read();
        let hits = inner.index.search(query, fetch_k)?;

        let candidates = hits
            .iter()
            .map(|(pos, _)| {
                inner.index.reconstruct(*pos).ok_or_else(|| {
                    Error::vector_store(format!("Index position {} out of range", pos))
                })
            })
            .collect::<Result<Vec<&[f32]>>>()?;

        let selected = maximal_marginal_relevance(query, &candidates, k, lambda_mult);

        selected
            .into_iter()
            .map(|i| {
                let (pos, distance) = hits[i];
                Ok(SearchResult {
                    chunk: inner.chunk_at(pos)?,
                    distance,
                })
            })
            .collect()
    }

    /// Chunks of a document in index order, with their embeddings restored
    pub fn document_chunks(&self, document_id: &Uuid) -> Vec<Chunk> {
        let inner = self.inner.read();
        inner
            .docstore
            .index_to_docstore_id
            .iter()
            .enumerate()
            .filter_map(|(pos, id)| {
                let chunk = inner.docstore.chunks.get(id)?;
                if chunk.document_id != *document_id {
                    return None;
                }
                let mut chunk = chunk.clone();
                chunk.embedding = inner.index.reconstruct(pos)?.to_vec();
                Some(chunk)
            })
            .collect()
    }

    /// Delete all chunks for a document
    pub fn delete_document(&self, document_id: &Uuid) -> usize {
        let mut inner = self.inner.write();

        let positions: HashSet<usize> = inner
            .docstore
            .index_to_docstore_id
            .iter()
            .enumerate()
            .filter(|(_, id)| {
                inner
                    .docstore
                    .chunks
                    .get(*id)
                    .is_some_and(|c| c.document_id == *document_id)
            })
            .map(|(pos, _)| pos)
            .collect();

        if positions.is_empty() {
            return 0;
        }

        let removed = inner.index.remove(&positions);

        let StoreInner { docstore, .. } = &mut *inner;
        let mut kept_ids = Vec::with_capacity(docstore.index_to_docstore_id.len() - positions.len());
        for (pos, id) in docstore.index_to_docstore_id.drain(..).enumerate() {
            if positions.contains(&pos) {
                docstore.chunks.remove(&id);
            } else {
                kept_ids.push(id);
            }
        }
        docstore.index_to_docstore_id = kept_ids;

        removed
    }

    /// Write `index.json` and `docstore.json` under the storage path
    pub fn save_local(&self) -> Result<()> {
        std::fs::create_dir_all(&self.storage_path)?;

        let (index_json, docstore_json) = {
            let inner = self.inner.read();
            (
                serde_json::to_vec(&inner.index)?,
                serde_json::to_vec(&inner.docstore)?,
            )
        };

        write_atomic(&self.storage_path.join(INDEX_FILE), &index_json)?;
        write_atomic(&self.storage_path.join(DOCSTORE_FILE), &docstore_json)?;

        tracing::debug!("Saved vector store to {}", self.storage_path.display());
        Ok(())
    }

    /// Read a store previously written with `save_local`
    pub fn load_local(storage_path: &Path) -> Result<Self> {
        let index: FlatL2Index =
            serde_json::from_slice(&std::fs::read(storage_path.join(INDEX_FILE))?)?;
        let docstore: Docstore =
            serde_json::from_slice(&std::fs::read(storage_path.join(DOCSTORE_FILE))?)?;

        if index.len() != docstore.index_to_docstore_id.len() {
            return Err(Error::vector_store(format!(
                "Corrupt store at {}: {} vectors but {} docstore ids",
                storage_path.display(),
                index.len(),
                docstore.index_to_docstore_id.len()
            )));
        }

        Ok(Self {
            inner: RwLock::new(StoreInner { index, docstore }),
            storage_path: storage_path.to_path_buf(),
        })
    }
}

impl StoreInner {
    fn chunk_at(&self, position: usize) -> Result<Chunk> {
        self.docstore
            .index_to_docstore_id
            .get(position)
            .and_then(|id| self.docstore.chunks.get(id))
            .cloned()
            .ok_or_else(|| {
                Error::vector_store(format!("No docstore entry for index position {}", position))
            })
    }
}

/// Write through a sibling `.tmp` file and rename it over `path`
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
