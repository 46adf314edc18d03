//! Run report: one per invocation, written next to the checkpoints.

use crate::validate::ValidationStats;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPeriod,
    Unreadable,
    Empty,
    NotExpenseTable,
    MissingColumns,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Accepted { rows: usize },
    Skipped { reason: SkipReason, detail: Option<String> },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub content_hash: Option<String>,
    #[serde(flatten)]
    pub status: FileStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Ok,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichStats {
    pub registry_rows: usize,
    pub registry_entries: usize,
    pub enriched_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub files: Vec<FileOutcome>,
    pub consolidated_rows: Option<usize>,
    pub validation: Option<ValidationStats>,
    pub enrichment: Option<EnrichStats>,
    pub aggregate_groups: Option<usize>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            error: None,
            files: Vec::new(),
            consolidated_rows: None,
            validation: None,
            enrichment: None,
            aggregate_groups: None,
        }
    }

    pub fn accepted(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Accepted { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.files.len() - self.accepted()
    }

    pub fn finish(&mut self, result: &Result<()>) {
        self.finished_at = Some(Utc::now());
        match result {
            Ok(()) => self.status = RunStatus::Ok,
            Err(e) => {
                self.status = RunStatus::Failed;
                self.error = Some(format!("{:#}", e));
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report {}", path.display()))
    }
}

/// `sha256:<hex>` digest of the given bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_format() {
        assert_eq!(
            content_hash(b"abc"),
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_accepted_and_skipped_counts() {
        let mut report = RunReport::start();
        report.files.push(FileOutcome {
            path: "a.csv".into(),
            content_hash: None,
            status: FileStatus::Accepted { rows: 3 },
        });
        report.files.push(FileOutcome {
            path: "b.csv".into(),
            content_hash: None,
            status: FileStatus::Skipped {
                reason: SkipReason::NotExpenseTable,
                detail: None,
            },
        });
        assert_eq!(report.accepted(), 1);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn test_file_outcome_json_shape() {
        let outcome = FileOutcome {
            path: "2025_01/x.csv".into(),
            content_hash: Some("sha256:00".to_string()),
            status: FileStatus::Skipped {
                reason: SkipReason::MissingColumns,
                detail: None,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "missing_columns");
        assert_eq!(json["path"], "2025_01/x.csv");
    }

    #[test]
    fn test_finish_records_failure() {
        let mut report = RunReport::start();
        report.finish(&Err(anyhow::anyhow!("boom")));
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.error.as_deref(), Some("boom"));
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("run_report.json");
        let mut report = RunReport::start();
        report.consolidated_rows = Some(4);
        report.finish(&Ok(()));
        report.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["consolidated_rows"], 4);
    }
}
