//! Markdown loader

use super::{normalize_whitespace, DocumentFormat, DocumentLoader, RawPage};
use crate::error::{Error, Result};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::path::Path;

/// Loads `.md` files as a single page of rendered text
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownLoader;

impl DocumentLoader for MarkdownLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Markdown
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::parse(path, e))?;
        Ok(vec![RawPage::new(0, markdown_to_text(&content))])
    }
}

/// Render Markdown to plain text, keeping block structure as blank lines
pub fn markdown_to_text(content: &str) -> String {
    let mut out = String::with_capacity(content.len());

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::Heading { .. }) => out.push_str("\n\n"),
            Event::End(TagEnd::Heading(_)) => out.push_str("\n\n"),
            Event::Start(Tag::CodeBlock(_)) | Event::End(TagEnd::CodeBlock) => {
                out.push_str("\n\n")
            }
            Event::Text(text) => out.push_str(&text),
            Event::Code(code) => out.push_str(&code),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph) => out.push_str("\n\n"),
            Event::Start(Tag::Item) => out.push_str("\n- "),
            Event::End(TagEnd::List(_)) => out.push_str("\n\n"),
            Event::Start(Tag::TableRow) | Event::Start(Tag::TableHead) => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push_str(" | "),
            _ => {}
        }
    }

    normalize_whitespace(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_markdown_to_text_keeps_blocks() {
        let markdown = r#"
# Toxic Foods

Chocolate contains **theobromine**, which is toxic to dogs.

## Signs

- Vomiting
- Tremors

Call the clinic with `weight` and amount eaten.
"#;
        let text = markdown_to_text(markdown);

        assert!(text.starts_with("Toxic Foods\n\nChocolate contains theobromine"));
        assert!(text.contains("- Vomiting\n- Tremors"));
        assert!(text.contains("with weight and amount"));
        assert!(!text.contains('#'));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_code_block_text_is_kept() {
        let text = markdown_to_text("Dose table:\n\n```\n10 kg: 5 ml\n```\n");
        assert!(text.contains("10 kg: 5 ml"));
    }

    #[test]
    fn test_load_markdown_file() {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        writeln!(file, "# Grapes\n\nGrapes can cause kidney failure.").unwrap();

        let pages = MarkdownLoader.load(file.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].index, 0);
        assert_eq!(pages[0].text, "Grapes\n\nGrapes can cause kidney failure.");
    }
}
