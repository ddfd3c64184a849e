//! Upload handling, PDF loading and text splitting

pub mod file_service;
mod parser;
mod pipeline;
mod splitter;

pub use file_service::{allowed_file, create_upload_folder, save_file, secure_filename};
pub use parser::{LoadedPdf, PageContent, PdfLoader};
pub use pipeline::IngestPipeline;
pub use splitter::RecursiveCharacterSplitter;

#[cfg(test)]
pub(crate) use parser::test_pdf;
