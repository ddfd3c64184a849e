//! Core types for the question-answering service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkSource, Document};
pub use query::QuestionRequest;
pub use response::{DocumentSummary, QuestionResponse, SourceRef, UploadResponse};
