//! PDF loader
//!
//! Text is extracted page by page with lopdf. When lopdf cannot read the
//! file or finds no text at all, pdf-extract is tried on the whole document
//! on a worker thread, since it can stall or panic on unusual fonts.

use super::{normalize_whitespace, DocumentFormat, DocumentLoader, RawPage};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

/// Upper bound for the whole-document fallback extractor
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Loads `.pdf` files as one record per page
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>> {
        let data = std::fs::read(path).map_err(|e| Error::parse(path, e))?;

        let primary_error = match extract_pages(&data) {
            Ok(pages) if pages.iter().any(|p| !p.text.is_empty()) => return Ok(pages),
            Ok(_) => "no extractable text".to_string(),
            Err(e) => e,
        };
        tracing::debug!(
            "Per-page extraction failed for {} ({}), trying fallback",
            path.display(),
            primary_error
        );

        match extract_whole_document(data) {
            Ok(text) if !text.is_empty() => Ok(vec![RawPage::new(0, text)]),
            Ok(_) => Err(Error::parse(
                path,
                "PDF has no extractable text (image-only or encrypted)",
            )),
            Err(fallback_error) => Err(Error::parse(
                path,
                format!("{}; fallback: {}", primary_error, fallback_error),
            )),
        }
    }
}

/// Per-page text with 0-based page indices
fn extract_pages(data: &[u8]) -> std::result::Result<Vec<RawPage>, String> {
    let document = lopdf::Document::load_mem(data).map_err(|e| e.to_string())?;

    let mut pages = Vec::new();
    for (index, page_number) in document.get_pages().keys().enumerate() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(RawPage::new(index, normalize_whitespace(&text))),
            Err(e) => {
                tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                pages.push(RawPage::new(index, String::new()));
            }
        }
    }

    Ok(pages)
}

fn extract_whole_document(data: Vec<u8>) -> std::result::Result<String, String> {
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let result = pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string());
        let _ = tx.send(result);
    });

    match rx.recv_timeout(FALLBACK_TIMEOUT) {
        Ok(result) => result.map(|text| normalize_whitespace(&text.replace('\0', ""))),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(format!("extraction timed out after {:?}", FALLBACK_TIMEOUT))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err("extraction thread panicked".to_string()),
    }
}
