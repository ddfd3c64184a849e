//! Document and chunk types with page tracking for sources

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A PDF that has been uploaded and indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Filename as uploaded by the user
    pub filename: String,
    /// Sanitized path the upload was saved to
    pub stored_path: String,
    /// SHA-256 of the extracted text, used for deduplication
    pub content_hash: String,
    /// Total number of pages
    pub total_pages: u32,
    /// Total number of chunks indexed
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(filename: String, stored_path: String, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            stored_path,
            content_hash,
            total_pages: 0,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Filename as uploaded
    pub filename: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Total pages in the document
    pub page_count: u32,
}

impl ChunkSource {
    /// Source info for a PDF page
    pub fn pdf(filename: String, page_number: u32, page_count: u32) -> Self {
        Self {
            filename,
            page_number,
            page_count,
        }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        format!("{}, Page {}", self.filename, self.page_number)
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector; lives in the index once stored
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information
    pub source: ChunkSource,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(document_id: Uuid, content: String, source: ChunkSource, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            chunk_index,
        }
    }
}
