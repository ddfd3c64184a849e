//! # pdf-rag
//!
//! PDF question answering over HTTP.
//!
//! ## Features
//!
//! - **Upload**: PDFs are saved, split page by page into overlapping chunks and embedded
//! - **Vector store**: exact L2 index with a JSON docstore, persisted after every change
//! - **Retrieval**: maximal-marginal-relevance over the nearest chunks
//! - **Generation**: answers from a local Ollama chat model, grounded in retrieved context
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pdf_rag::{RagConfig, RagServer};
//!
//! #[tokio::main]
//! async fn main() -> pdf_rag::Result<()> {
//!     let config = RagConfig::load(None)?;
//!     let server = RagServer::new(config).await?;
//!     server.start().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use server::{state::AppState, RagServer};
