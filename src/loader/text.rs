//! Plain text loader

use super::{is_binary_content, normalize_whitespace, DocumentFormat, DocumentLoader, RawPage};
use crate::error::{Error, Result};
use std::path::Path;

/// Loads `.txt` files; content must be valid UTF-8
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>> {
        let bytes = std::fs::read(path).map_err(|e| Error::parse(path, e))?;
        if is_binary_content(&bytes) {
            return Err(Error::parse(path, "file appears to be binary"));
        }

        let content = String::from_utf8(bytes)
            .map_err(|e| Error::parse(path, format!("not valid UTF-8: {}", e)))?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        Ok(vec![RawPage::new(0, normalize_whitespace(content))])
    }
}
