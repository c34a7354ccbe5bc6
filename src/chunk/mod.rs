//! Text chunking
//!
//! This module handles splitting extracted pages into overlapping windows
//! while:
//! - Preferring paragraph, then sentence, then word boundaries
//! - Keeping every chunk within `max_chars` characters
//! - Overlapping consecutive chunks by exactly `overlap_chars`
//! - Computing content hashes for stable point ids
//!
//! Windows never span two pages, so every chunk has one page/record index.

mod boundaries;

pub use boundaries::*;

use crate::config::ChunkConfig;
use crate::loader::{DocumentFormat, RawDocument};
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A text chunk with source metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text, never whitespace-only
    pub text: String,

    /// Source file identifier (path as ingested)
    pub source: String,

    /// Format of the source file
    pub format: DocumentFormat,

    /// 0-based page / sheet / row index
    pub page: usize,

    /// Sequence number within the source document (0-based)
    pub sequence: usize,

    /// Blake3 hash of source and text
    pub hash: String,
}

impl Chunk {
    /// Compute the hash for a chunk
    pub fn compute_hash(source: &str, text: &str) -> String {
        let mut hasher = Hasher::new();
        hasher.update(source.as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// File name of the source, for citations
    pub fn source_name(&self) -> String {
        Path::new(&self.source)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.clone())
    }

    /// Human-readable reference such as `guide.pdf (page 3)`
    pub fn citation(&self) -> String {
        let n = self.page + 1;
        match self.format {
            DocumentFormat::Pdf => format!("{} (page {})", self.source_name(), n),
            DocumentFormat::Csv => format!("{} (row {})", self.source_name(), n),
            DocumentFormat::Spreadsheet => format!("{} (sheet {})", self.source_name(), n),
            _ => self.source_name(),
        }
    }
}

/// Chunk one document, page by page, numbering chunks across pages
pub fn chunk_document(doc: &RawDocument, config: &ChunkConfig) -> Vec<Chunk> {
    let source = doc.source.display().to_string();
    let mut chunks = Vec::new();

    for page in &doc.pages {
        for text in split_text(&page.text, config.max_chars, config.overlap_chars) {
            let hash = Chunk::compute_hash(&source, &text);
            chunks.push(Chunk {
                text,
                source: source.clone(),
                format: doc.format,
                page: page.index,
                sequence: chunks.len(),
                hash,
            });
        }
    }

    chunks
}

/// Chunk documents in order
pub fn chunk_documents(docs: &[RawDocument], config: &ChunkConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = docs
        .iter()
        .flat_map(|doc| chunk_document(doc, config))
        .collect();

    tracing::info!("Split {} documents into {} chunks", docs.len(), chunks.len());
    chunks
}

/// Split text into windows of at most `max_chars` characters
///
/// A window ends at the best break point in its second half; the next
/// window starts `overlap_chars` before that end.
///
/// Whitespace-only windows are dropped, which loses the overlap between
/// their neighbours. Pages from the loaders are already passed through
/// [`normalize_whitespace`](crate::loader::normalize_whitespace), so runs of
/// whitespace never fill a window; raw text should be normalized first.
pub fn split_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.trim().is_empty() {
        return Vec::new();
    }
    // Keep forward progress even with an invalid configuration
    let overlap = overlap_chars.min(max_chars.saturating_sub(1));

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let break_points = find_break_points(text);

    let mut windows = Vec::new();
    let mut start = 0;

    loop {
        let end = if total - start <= max_chars {
            total
        } else {
            let limit = start + max_chars;
            let min_end = start + (max_chars / 2).max(overlap + 1);
            best_break(&break_points, min_end, limit).unwrap_or(limit)
        };

        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            windows.push(window);
        }

        if end >= total {
            break;
        }
        start = end - overlap;
    }

    windows
}
