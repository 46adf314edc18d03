//! Persisted datasets between stages: UTF-8, comma-delimited, header always
//! present. Re-reading a checkpoint yields the same rows in the same order.

use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn write_checkpoint<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    // Header written by hand so an empty dataset still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create checkpoint {}", path.display()))?;

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

pub fn read_checkpoint<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(PipelineError::MissingCheckpoint(path.to_path_buf()).into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to open checkpoint {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        let row: T = result
            .with_context(|| format!("Invalid row {} in {}", idx + 2, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Zero rows at stage entry means something upstream produced nothing.
pub fn require_rows<T>(rows: &[T], stage: &'static str) -> Result<(), PipelineError> {
    if rows.is_empty() {
        return Err(PipelineError::EmptyDataset { stage });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{ExpenseRecord, CONSOLIDATED_HEADER};

    fn record(id: &str, name: &str, value: Option<f64>) -> ExpenseRecord {
        ExpenseRecord {
            identifier: id.to_string(),
            entity_name: name.to_string(),
            quarter: 2,
            year: 2025,
            expense_value: value,
        }
    }

    #[test]
    fn test_roundtrip_preserves_rows_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("consolidado_despesas.csv");
        let rows = vec![
            record("01234567000189", "Op, \"Quoted\"", Some(1234.56)),
            record("11222333000181", "Op B", Some(0.1 + 0.2)),
            record("", "", None),
            record("99", "Big", Some(123456789012.34)),
        ];

        write_checkpoint(&path, CONSOLIDATED_HEADER, &rows).unwrap();
        let back: Vec<ExpenseRecord> = read_checkpoint(&path).unwrap();

        assert_eq!(back, rows);
        // leading zero kept
        assert_eq!(back[0].identifier, "01234567000189");
    }

    #[test]
    fn test_header_row_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");
        write_checkpoint(&path, CONSOLIDATED_HEADER, &[record("1", "A", Some(10.0))]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("CNPJ,RazaoSocial,Trimestre,Ano,ValorDespesas"));
        assert_eq!(lines.next(), Some("1,A,2,2025,10.0"));
    }

    #[test]
    fn test_empty_dataset_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_checkpoint::<ExpenseRecord>(&path, CONSOLIDATED_HEADER, &[]).unwrap();
        let back: Vec<ExpenseRecord> = read_checkpoint(&path).unwrap();
        assert!(back.is_empty());
        let err = require_rows(&back, "enrich").unwrap_err();
        assert!(err.to_string().contains("no data produced"));
    }

    #[test]
    fn test_missing_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_checkpoint::<ExpenseRecord>(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingCheckpoint(_))
        ));
    }
}
