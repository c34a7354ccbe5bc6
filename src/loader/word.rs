//! Word document loader

use super::{normalize_whitespace, DocumentFormat, DocumentLoader, RawPage};
use crate::error::{Error, Result};
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use std::path::Path;

/// Loads `.docx` files; legacy `.doc` containers fail with a parse error
#[derive(Debug, Clone, Copy, Default)]
pub struct WordLoader;

impl DocumentLoader for WordLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Word
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>> {
        let data = std::fs::read(path).map_err(|e| Error::parse(path, e))?;
        let docx = docx_rs::read_docx(&data).map_err(|e| Error::parse(path, e))?;

        let mut text = String::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => {
                    push_paragraph(&mut text, p);
                    text.push_str("\n\n");
                }
                DocumentChild::Table(table) => {
                    push_table(&mut text, table);
                    text.push_str("\n\n");
                }
                _ => {}
            }
        }

        Ok(vec![RawPage::new(0, normalize_whitespace(&text))])
    }
}

fn push_paragraph(out: &mut String, paragraph: &Paragraph) {
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => out.push_str(&t.text),
                    RunChild::Tab(_) => out.push(' '),
                    RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }
}

/// Tables are flattened row by row, cells separated by ` | `
fn push_table(out: &mut String, table: &Table) {
    for child in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let TableChild::TableRow(row) = child else {
            continue;
        };

        let mut cells: Vec<String> = Vec::with_capacity(row.cells.len());
        for cell in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let mut cell_text = String::new();
            for content in &cell.children {
                if let TableCellContent::Paragraph(p) = content {
                    push_paragraph(&mut cell_text, p);
                    cell_text.push(' ');
                }
            }
            cells.push(cell_text.trim().to_string());
        }

        if cells.iter().any(|c| !c.is_empty()) {
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
    }
}
