//! PDF loading with page tracking

use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, Result};

/// Upper bound for whole-document extraction with pdf-extract
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Content from a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
    /// Character offset in the full document
    pub char_offset: usize,
}

/// A loaded PDF split into pages
#[derive(Debug, Clone)]
pub struct LoadedPdf {
    /// Pages that produced text, in document order
    pub pages: Vec<PageContent>,
    /// Page count reported by the PDF
    pub total_pages: u32,
    /// Hex SHA-256 of the extracted text
    pub content_hash: String,
}

impl LoadedPdf {
    /// Full text with pages separated by blank lines
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// PDF loader producing one entry per page
pub struct PdfLoader;

impl PdfLoader {
    /// Load a PDF from disk
    pub fn load_file(path: &Path) -> Result<LoadedPdf> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::load_bytes(&name, &data)
    }

    /// Load a PDF from memory
    pub fn load_bytes(filename: &str, data: &[u8]) -> Result<LoadedPdf> {
        let (raw_pages, total_pages) = match lopdf::Document::load_mem(data) {
            Ok(doc) => {
                let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
                let total = page_numbers.len() as u32;
                let mut pages = Vec::with_capacity(page_numbers.len());

                for page_number in page_numbers {
                    match doc.extract_text(&[page_number]) {
                        Ok(text) => pages.push((page_number, text)),
                        Err(e) => {
                            tracing::debug!("Could not extract page {} of '{}': {}", page_number, filename, e);
                        }
                    }
                }
                (pages, total)
            }
            Err(e) => {
                tracing::warn!("lopdf could not open '{}': {}", filename, e);
                (Vec::new(), 0)
            }
        };

        let mut pages = Self::build_pages(raw_pages);

        if pages.is_empty() {
            tracing::warn!("Per-page extraction produced no text for '{}', trying pdf-extract", filename);
            let text = Self::extract_whole_document(filename, data)?;
            pages = Self::build_pages(vec![(1, text)]);
        }

        if pages.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF. It may be image-based or encrypted.",
            ));
        }

        let total_pages = total_pages.max(pages.len() as u32);
        let mut loaded = LoadedPdf {
            pages,
            total_pages,
            content_hash: String::new(),
        };
        loaded.content_hash = hash_content(&loaded.full_text());

        tracing::debug!(
            "Loaded '{}': {} pages, {} with text",
            filename,
            loaded.total_pages,
            loaded.pages.len()
        );

        Ok(loaded)
    }

    /// Clean page texts, drop empty pages and assign character offsets
    fn build_pages(raw: Vec<(u32, String)>) -> Vec<PageContent> {
        let mut pages = Vec::with_capacity(raw.len());
        let mut offset = 0usize;

        for (page_number, text) in raw {
            let content = cleanup_pdf_text(&text);
            if content.is_empty() {
                continue;
            }
            let len = content.chars().count();
            pages.push(PageContent {
                page_number,
                content,
                char_offset: offset,
            });
            offset += len + 2; // "\n\n" between pages
        }

        pages
    }

    /// Whole-document extraction with pdf-extract on a helper thread so a hang on
    /// problematic fonts cannot stall ingestion
    fn extract_whole_document(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::thread;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(EXTRACT_TIMEOUT) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::file_parse(filename, format!("pdf-extract failed: {}", e))),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::file_parse(
                filename,
                format!("PDF extraction timed out after {}s", EXTRACT_TIMEOUT.as_secs()),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::file_parse(filename, "PDF extraction thread crashed"))
            }
        }
    }
}

fn blank_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"))
}

/// Normalize extracted PDF text while keeping paragraph breaks for the splitter
fn cleanup_pdf_text(text: &str) -> String {
    let replaced = text
        .replace('\0', "")
        .replace('\r', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    let trimmed = replaced
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    blank_runs().replace_all(&trimmed, "\n\n").trim().to_string()
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
