//! Document loading and text extraction
//!
//! This module handles:
//! - Mapping a file extension to exactly one supported format
//! - Format-specific loaders behind the [`DocumentLoader`] trait
//! - Whitespace normalization shared by all loaders
//!
//! Selection never fails: an unknown extension yields
//! [`LoaderSelection::Unsupported`]. Loader errors are returned to the
//! caller, which decides whether to skip the file.

mod html;
mod markdown;
#[cfg(feature = "pdf")]
mod pdf;
mod tabular;
mod text;
mod word;

pub use html::*;
pub use markdown::*;
#[cfg(feature = "pdf")]
pub use pdf::*;
pub use tabular::*;
pub use text::*;
pub use word::*;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Formats the dispatcher knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Word,
    #[serde(rename = "text")]
    PlainText,
    Markdown,
    Csv,
    Spreadsheet,
    Html,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 7] = [
        DocumentFormat::Pdf,
        DocumentFormat::Word,
        DocumentFormat::PlainText,
        DocumentFormat::Markdown,
        DocumentFormat::Csv,
        DocumentFormat::Spreadsheet,
        DocumentFormat::Html,
    ];

    /// Extensions (lowercase, without dot) mapped to this format
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentFormat::Pdf => &["pdf"],
            DocumentFormat::Word => &["docx", "doc"],
            DocumentFormat::PlainText => &["txt"],
            DocumentFormat::Markdown => &["md"],
            DocumentFormat::Csv => &["csv"],
            DocumentFormat::Spreadsheet => &["xlsx", "xls"],
            DocumentFormat::Html => &["html", "htm"],
        }
    }

    /// Detect format from an extension, case-insensitively
    pub fn from_extension(extension: &str) -> Option<Self> {
        let lower = extension.trim_start_matches('.').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&lower.as_str()))
    }

    /// Detect format from a file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Word => "word",
            DocumentFormat::PlainText => "text",
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Csv => "csv",
            DocumentFormat::Spreadsheet => "spreadsheet",
            DocumentFormat::Html => "html",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page (PDF), sheet (spreadsheet) or row (CSV) of extracted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 0-based page / sheet / row index within the file
    pub index: usize,
    pub text: String,
}

impl RawPage {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Extracted contents of one source file
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Source file path (document identity)
    pub source: PathBuf,
    pub format: DocumentFormat,
    pub pages: Vec<RawPage>,
}

impl RawDocument {
    /// Total characters across all pages
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// A format-specific text extractor
pub trait DocumentLoader: Send + Sync {
    /// Format handled by this loader
    fn format(&self) -> DocumentFormat;

    /// Read and extract the file, one entry per page/sheet/record
    fn load(&self, path: &Path) -> Result<Vec<RawPage>>;
}

/// Result of looking up a loader for a path
pub enum LoaderSelection {
    Supported(&'static dyn DocumentLoader),
    Unsupported { extension: String },
}

impl std::fmt::Debug for LoaderSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderSelection::Supported(loader) => {
                f.debug_tuple("Supported").field(&loader.format()).finish()
            }
            LoaderSelection::Unsupported { extension } => f
                .debug_struct("Unsupported")
                .field("extension", extension)
                .finish(),
        }
    }
}

/// Loader registered for a format; `None` when the format is compiled out
pub fn loader_for(format: DocumentFormat) -> Option<&'static dyn DocumentLoader> {
    match format {
        #[cfg(feature = "pdf")]
        DocumentFormat::Pdf => Some(&PdfLoader),
        #[cfg(not(feature = "pdf"))]
        DocumentFormat::Pdf => None,
        DocumentFormat::Word => Some(&WordLoader),
        DocumentFormat::PlainText => Some(&PlainTextLoader),
        DocumentFormat::Markdown => Some(&MarkdownLoader),
        DocumentFormat::Csv => Some(&CsvLoader),
        DocumentFormat::Spreadsheet => Some(&SpreadsheetLoader),
        DocumentFormat::Html => Some(&HtmlLoader),
    }
}

/// Select the loader for a path by its extension
pub fn select_loader(path: &Path) -> LoaderSelection {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();

    match DocumentFormat::from_extension(&extension).and_then(loader_for) {
        Some(loader) => LoaderSelection::Supported(loader),
        None => LoaderSelection::Unsupported { extension },
    }
}

/// Check if content appears to be binary
pub fn is_binary_content(data: &[u8]) -> bool {
    // Check for null bytes in the first 8KB
    let check_len = std::cmp::min(data.len(), 8192);
    data[..check_len].iter().any(|&b| b == 0)
}

/// Normalize whitespace, keeping paragraph breaks as a blank line
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_newlines = 0usize;
    let mut pending_space = false;

    for c in text.chars() {
        if c == '\n' {
            pending_newlines += 1;
        } else if c.is_whitespace() {
            pending_space = true;
        } else {
            if !result.is_empty() {
                match pending_newlines {
                    0 if pending_space => result.push(' '),
                    0 => {}
                    1 => result.push('\n'),
                    _ => result.push_str("\n\n"),
                }
            }
            pending_newlines = 0;
            pending_space = false;
            result.push(c);
        }
    }

    result
}
