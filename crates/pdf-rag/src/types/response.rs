//! Response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Chunk, Document};

/// Maximum snippet length in a source reference
const SNIPPET_LEN: usize = 200;

/// A retrieved chunk that was handed to the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Leading part of the chunk text
    pub snippet: String,
    /// Squared L2 distance between the chunk and the question
    pub distance: f32,
}

impl SourceRef {
    /// Build a source reference from a retrieved chunk
    pub fn from_chunk(chunk: &Chunk, distance: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            snippet: truncate_snippet(&chunk.content, SNIPPET_LEN),
            distance,
        }
    }
}

const ELLIPSIS: &str = "...";

/// Truncate to at most `max_chars` characters including the trailing ellipsis,
/// preferring a word boundary
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars.saturating_sub(ELLIPSIS.len())).collect();
    match cut.rfind(' ') {
        Some(pos) if pos > 0 => format!("{}{}", &cut[..pos], ELLIPSIS),
        _ => format!("{}{}", cut, ELLIPSIS),
    }
}

/// Answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    /// Generated answer
    pub answer: String,
    /// Chunks the answer was conditioned on, in retrieval order
    pub sources: Vec<SourceRef>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Document summary for upload and listing responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub total_pages: u32,
    pub total_chunks: u32,
    pub file_size: u64,
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            total_pages: doc.total_pages,
            total_chunks: doc.total_chunks,
            file_size: doc.file_size,
            ingested_at: doc.ingested_at,
        }
    }
}

/// Result of `POST /pdf/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human-readable outcome
    pub message: String,
    /// The indexed document (existing one for duplicate uploads)
    pub document: DocumentSummary,
    /// Whether the content was already indexed
    pub duplicate: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}
