//! HTML loader

use super::{normalize_whitespace, DocumentFormat, DocumentLoader, RawPage};
use crate::error::{Error, Result};
use scraper::{Html, Selector};
use std::path::Path;

/// Wide enough that html2text never wraps a paragraph
const RENDER_WIDTH: usize = 4096;

/// Loads `.html` / `.htm` files as a single page of visible text
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLoader;

impl DocumentLoader for HtmlLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Html
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>> {
        let bytes = std::fs::read(path).map_err(|e| Error::parse(path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        let text = html_to_text(&content).map_err(|e| Error::parse(path, e))?;
        Ok(vec![RawPage::new(0, text)])
    }
}

/// Extract readable text from an HTML document
///
/// Only the `<body>` is rendered when present, so `<title>` and `<head>`
/// contents do not leak into the text.
pub fn html_to_text(content: &str) -> std::result::Result<String, String> {
    let document = Html::parse_document(content);

    let root = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next().map(|e| e.html()))
        .unwrap_or_else(|| content.to_string());

    let text = html2text::from_read(root.as_bytes(), RENDER_WIDTH)
        .map_err(|e| format!("html rendering failed: {}", e))?;

    Ok(normalize_whitespace(&strip_link_markers(&text)))
}

/// html2text renders links as `[text][n]` plus a footnote list; keep only the text
fn strip_link_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if is_footnote_line(line) {
            continue;
        }
        let mut rest = line;
        while let Some(pos) = rest.find("][") {
            let head = &rest[..pos];
            let tail = &rest[pos + 2..];
            let footnote_end = tail
                .find(']')
                .filter(|&end| end > 0 && tail[..end].bytes().all(|b| b.is_ascii_digit()));
            match (footnote_end, head.rfind('[')) {
                (Some(end), Some(open)) => {
                    out.push_str(&head[..open]);
                    out.push_str(&head[open + 1..]);
                    rest = &tail[end + 1..];
                }
                _ => {
                    out.push_str(&rest[..pos + 2]);
                    rest = tail;
                }
            }
        }
        out.push_str(rest);
        out.push('\n');
    }
    out
}

fn is_footnote_line(line: &str) -> bool {
    line.trim_start()
        .strip_prefix('[')
        .and_then(|rest| rest.split_once("]: "))
        .map(|(n, _)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_html_body_text() {
        let html = r#"<html>
<head><title>Clinic Handout</title><style>p { color: red; }</style></head>
<body>
<h1>Lilies</h1>
<p>All parts of the lily are toxic to cats.</p>
<p>Seek care <a href="https://example.com/er">immediately</a>.</p>
</body>
</html>"#;
        let text = html_to_text(html).unwrap();

        assert!(text.contains("Lilies"));
        assert!(text.contains("All parts of the lily are toxic to cats."));
        assert!(text.contains("immediately"));
        assert!(!text.contains("Clinic Handout"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("https://example.com/er"));
    }

    #[test]
    fn test_strip_link_markers() {
        let rendered = "Seek care [immediately][1] or call [the clinic][12].\n\n[1]: https://a.example\n[12]: https://b.example\n";
        assert_eq!(
            strip_link_markers(rendered),
            "Seek care immediately or call the clinic.\n\n"
        );
        assert_eq!(strip_link_markers("array[0][x]\n"), "array[0][x]\n");
    }

    #[test]
    fn test_load_html_file() {
        let mut file = tempfile::Builder::new().suffix(".htm").tempfile().unwrap();
        write!(file, "<p>Onions damage red blood cells.</p>").unwrap();

        let pages = HtmlLoader.load(file.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.contains("Onions damage red blood cells."));
    }
}
