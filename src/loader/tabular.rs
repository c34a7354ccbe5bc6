//! CSV and spreadsheet loaders

use super::{DocumentFormat, DocumentLoader, RawPage};
use crate::error::{Error, Result};
use calamine::{Data, Reader};
use std::path::Path;

/// Loads `.csv` files as one record per data row
///
/// Each record reads `header: value` per column, so a row retrieved on its
/// own still carries the meaning of its cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLoader;

impl DocumentLoader for CsvLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Csv
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| Error::parse(path, e))?;

        let headers = reader.headers().map_err(|e| Error::parse(path, e))?.clone();

        let mut pages = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| Error::parse(path, e))?;

            let lines: Vec<String> = record
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_empty())
                .map(|(col, value)| match headers.get(col).filter(|h| !h.is_empty()) {
                    Some(header) => format!("{}: {}", header, value),
                    None => value.to_string(),
                })
                .collect();

            if !lines.is_empty() {
                pages.push(RawPage::new(row, lines.join("\n")));
            }
        }

        Ok(pages)
    }
}

/// Loads `.xlsx` / `.xls` workbooks as one record per sheet
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetLoader;

impl DocumentLoader for SpreadsheetLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Spreadsheet
    }

    fn load(&self, path: &Path) -> Result<Vec<RawPage>> {
        let mut workbook = calamine::open_workbook_auto(path).map_err(|e| Error::parse(path, e))?;

        let mut pages = Vec::new();
        for (index, sheet_name) in workbook.sheet_names().to_vec().into_iter().enumerate() {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!("Skipping sheet '{}' in {}: {}", sheet_name, path.display(), e);
                    continue;
                }
            };

            let mut sheet_text = format!("Sheet: {}\n", sheet_name);
            let mut has_rows = false;
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(cell_to_string).collect();
                if cells.iter().all(|c| c.is_empty()) {
                    continue;
                }
                sheet_text.push_str(&cells.join(" | "));
                sheet_text.push('\n');
                has_rows = true;
            }

            if has_rows {
                pages.push(RawPage::new(index, sheet_text.trim_end().to_string()));
            }
        }

        Ok(pages)
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}
