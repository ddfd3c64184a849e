//! Recursive character text splitting with overlap

use std::collections::VecDeque;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, ChunkSource};

use super::parser::PageContent;

/// Splits text on a prioritized list of separators until every piece fits `chunk_size`
///
/// Lengths are measured in characters. Separators stay attached to the start of the piece
/// that follows them, so joining pieces back together loses nothing but the trimmed
/// whitespace at chunk edges.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators (`"\n\n"`, `"\n"`, `" "`, `""`)
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: ChunkingConfig::default().separators,
        }
    }

    /// Create a splitter from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators.clone(),
        }
    }

    /// Split text into chunks of at most `chunk_size` characters where separators allow
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split every page on its own and tag each chunk with its page number
    pub fn split_pages(
        &self,
        document_id: Uuid,
        filename: &str,
        pages: &[PageContent],
        total_pages: u32,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for text in self.split_text(&page.content) {
                let source = ChunkSource::pdf(filename.to_string(), page.page_number, total_pages);
                let index = chunks.len() as u32;
                chunks.push(Chunk::new(document_id, text, source, index));
            }
        }

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        // First separator present in the text wins; "" always matches
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut good_splits: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                if let Some(chunk) = join_trimmed(&[piece]) {
                    final_chunks.push(chunk);
                }
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily merge small pieces into chunks, carrying an overlap window forward
    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = join_trimmed(current.make_contiguous()) {
                        docs.push(doc);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_trimmed(current.make_contiguous()) {
            docs.push(doc);
        }

        docs
    }
}

/// Split at every occurrence of `separator`, keeping it at the start of the following piece
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_trimmed(pieces: &[&str]) -> Option<String> {
    let joined = pieces.concat();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
