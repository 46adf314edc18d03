//! Format decoder: raw file on disk -> header row + rows of untyped cells.
//!
//! Delimited text is semicolon-separated in a legacy 8-bit encoding and may
//! contain broken lines; spreadsheets are read from their first sheet.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;
use std::path::Path;

/// A single untyped cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Textual form of the cell. Integral numbers render without a fractional
    /// part so numeric identifiers keep their plain digits.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Lines dropped by the decoder because they could not be parsed.
    pub skipped_lines: usize,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, column); rows shorter than the header read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }
}

/// Which decoder a file goes through, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Delimited,
    Spreadsheet,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(FileFormat::Delimited),
            "xls" | "xlsx" => Some(FileFormat::Spreadsheet),
            _ => None,
        }
    }
}

/// Decode delimited text. Bytes are read as Windows-1252 (a UTF-8 BOM switches
/// to UTF-8). Lines the csv reader rejects, or with more fields than the
/// header, are skipped; short lines are padded with empty cells.
pub fn decode_delimited(bytes: &[u8], delimiter: u8) -> Result<RawTable> {
    let (text, _, _) = WINDOWS_1252.decode(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let width = headers.len();
    let mut rows = Vec::new();
    let mut skipped_lines = 0;

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed line");
                skipped_lines += 1;
                continue;
            }
        };

        if record.len() > width {
            skipped_lines += 1;
            continue;
        }

        let mut row: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        row.resize(width, Cell::Empty);
        rows.push(row);
    }

    Ok(RawTable {
        headers,
        rows,
        skipped_lines,
    })
}

/// Decode the first worksheet of an .xls/.xlsx file.
pub fn decode_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("Failed to open spreadsheet")?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("Spreadsheet has no sheets")?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .context("Failed to read sheet")?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row
            .iter()
            .map(|cell| match cell {
                Data::String(s) => s.trim().to_string(),
                Data::Empty => String::new(),
                other => format!("{}", other),
            })
            .collect(),
        None => return Ok(RawTable::default()),
    };

    let rows = rows_iter
        .map(|row| {
            let mut cells: Vec<Cell> = row
                .iter()
                .map(|cell| match cell {
                    Data::Empty => Cell::Empty,
                    Data::Float(f) => Cell::Number(*f),
                    Data::Int(i) => Cell::Number(*i as f64),
                    Data::String(s) => Cell::Text(s.clone()),
                    other => Cell::Text(format!("{}", other)),
                })
                .collect();
            cells.resize(headers.len(), Cell::Empty);
            cells
        })
        .collect();

    Ok(RawTable {
        headers,
        rows,
        skipped_lines: 0,
    })
}

/// Decode any supported file. `Ok(None)` means the extension is not one we read.
pub fn decode_file(path: &Path) -> Result<Option<RawTable>> {
    match FileFormat::from_path(path) {
        Some(FileFormat::Delimited) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            decode_delimited(&bytes, b';').map(Some)
        }
        Some(FileFormat::Spreadsheet) => decode_spreadsheet(path).map(Some),
        None => Ok(None),
    }
}
