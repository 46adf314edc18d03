//! Stage entry points. Each stage reads the previous checkpoint from disk,
//! fully materializes its output and writes its own checkpoint.

use crate::aggregate::{aggregate, AGGREGATED_HEADER};
use crate::checkpoint::{read_checkpoint, require_rows, write_checkpoint};
use crate::config::Config;
use crate::enrich::{enrich, EnrichedRecord, ENRICHED_HEADER};
use crate::error::PipelineError;
use crate::normalize::{normalize_table, ExpenseRecord, CONSOLIDATED_HEADER};
use crate::period::extract_period;
use crate::registry::{dedup_registry, load_registry};
use crate::report::{content_hash, EnrichStats, FileOutcome, FileStatus, RunReport, SkipReason};
use crate::schema::is_expense_table;
use crate::table::{decode_delimited, decode_file, decode_spreadsheet, FileFormat};
use crate::validate::validate_records;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of walking the intermediate tree.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Candidate source files in path order.
    pub files: Vec<PathBuf>,
    /// Directories or entries the walk could not read, with the cause.
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Walk `root` recursively without following symlinks. A symlinked
/// directory is never entered, so each source file is seen exactly once.
pub fn discover_files(root: &Path) -> Discovery {
    let mut discovery = Discovery::default();
    if !root.exists() {
        return discovery;
    }

    for entry in WalkDir::new(root).follow_links(false) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && FileFormat::from_path(entry.path()).is_some() {
                    discovery.files.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                tracing::warn!(path = %path.display(), error = %e, "cannot read entry");
                discovery.unreadable.push((path, e.to_string()));
            }
        }
    }

    discovery.files.sort();
    discovery.unreadable.sort();
    discovery
}

fn skipped(reason: SkipReason, detail: Option<String>) -> FileStatus {
    FileStatus::Skipped { reason, detail }
}

/// Decode, classify and normalize one source file.
fn process_file(path: &Path, records: &mut Vec<ExpenseRecord>) -> (Option<String>, FileStatus) {
    let Some(period) = extract_period(path) else {
        return (None, skipped(SkipReason::NoPeriod, None));
    };

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => return (None, skipped(SkipReason::Unreadable, Some(e.to_string()))),
    };
    let hash = Some(content_hash(&bytes));

    let decoded = match FileFormat::from_path(path) {
        Some(FileFormat::Delimited) => decode_delimited(&bytes, b';'),
        Some(FileFormat::Spreadsheet) => decode_spreadsheet(path),
        None => return (hash, skipped(SkipReason::Unreadable, Some("unsupported format".into()))),
    };
    let table = match decoded {
        Ok(t) => t,
        Err(e) => return (hash, skipped(SkipReason::Unreadable, Some(format!("{:#}", e)))),
    };

    if table.is_empty() {
        return (hash, skipped(SkipReason::Empty, None));
    }
    if !is_expense_table(&table.headers) {
        return (hash, skipped(SkipReason::NotExpenseTable, None));
    }

    let normalized = normalize_table(&table, period);
    if normalized.is_empty() {
        return (hash, skipped(SkipReason::MissingColumns, None));
    }

    tracing::info!(
        file = %path.display(),
        year = period.year,
        quarter = period.quarter,
        rows = normalized.len(),
        skipped_lines = table.skipped_lines,
        "accepted"
    );
    let rows = normalized.len();
    records.extend(normalized);
    (hash, FileStatus::Accepted { rows })
}

fn log_checkpoint(path: &Path, rows: usize) {
    let size_kb = std::fs::metadata(path)
        .map(|m| m.len() as f64 / 1024.0)
        .unwrap_or(0.0);
    tracing::info!(
        checkpoint = %path.display(),
        rows,
        size_kb = %format!("{:.2}", size_kb),
        "checkpoint written"
    );
}

/// Stage 1: source files -> consolidated expense checkpoint.
pub fn consolidate(config: &Config, report: &mut RunReport) -> Result<Vec<ExpenseRecord>> {
    tracing::info!(dir = %config.intermediate_dir.display(), "consolidating source files");

    let discovery = discover_files(&config.intermediate_dir);
    let mut records = Vec::new();

    for path in discovery.files {
        let (content_hash, status) = process_file(&path, &mut records);
        if let FileStatus::Skipped { reason, detail } = &status {
            tracing::debug!(file = %path.display(), ?reason, ?detail, "skipped");
        }
        report.files.push(FileOutcome {
            path,
            content_hash,
            status,
        });
    }
    for (path, error) in discovery.unreadable {
        report.files.push(FileOutcome {
            path,
            content_hash: None,
            status: skipped(SkipReason::Unreadable, Some(error)),
        });
    }

    if records.is_empty() {
        tracing::warn!("no expense data found; writing empty checkpoint");
    }

    let dest = config.consolidated_path();
    write_checkpoint(&dest, CONSOLIDATED_HEADER, &records)?;
    log_checkpoint(&dest, records.len());

    report.consolidated_rows = Some(records.len());
    Ok(records)
}

/// Stage 2: consolidated checkpoint + registry -> enriched checkpoint.
pub fn enrich_stage(config: &Config, report: &mut RunReport) -> Result<Vec<EnrichedRecord>> {
    let consolidated: Vec<ExpenseRecord> = read_checkpoint(&config.consolidated_path())?;
    require_rows(&consolidated, "enrich")?;

    let (valid, stats) = validate_records(consolidated);
    tracing::info!(
        input = stats.input_rows,
        valid = stats.valid_rows,
        invalid_identifier = stats.invalid_identifier,
        invalid_value = stats.invalid_value,
        empty_name = stats.empty_name,
        "validated consolidated rows"
    );
    report.validation = Some(stats);

    if !config.registry_path.exists() {
        return Err(PipelineError::MissingInput(config.registry_path.clone()).into());
    }
    let table = decode_file(&config.registry_path)
        .context("Failed to decode registry")?
        .with_context(|| format!("Unsupported registry format: {}", config.registry_path.display()))?;

    let loaded = load_registry(&table)?;
    let registry_rows = loaded.len();
    let registry = dedup_registry(loaded);
    tracing::info!(
        rows = registry_rows,
        entries = registry.len(),
        "registry loaded"
    );

    let enriched = enrich(valid, &registry)?;
    let unmatched = enriched.iter().filter(|r| r.missing_registry).count();
    report.enrichment = Some(EnrichStats {
        registry_rows,
        registry_entries: registry.len(),
        enriched_rows: enriched.len(),
        matched_rows: enriched.len() - unmatched,
        unmatched_rows: unmatched,
    });

    if enriched.is_empty() {
        tracing::warn!("no rows survived validation; writing empty checkpoint");
    }

    let dest = config.enriched_path();
    write_checkpoint(&dest, ENRICHED_HEADER, &enriched)?;
    log_checkpoint(&dest, enriched.len());

    Ok(enriched)
}

/// Stage 3: enriched checkpoint -> aggregated KPIs checkpoint.
pub fn aggregate_stage(config: &Config, report: &mut RunReport) -> Result<usize> {
    let enriched: Vec<EnrichedRecord> = read_checkpoint(&config.enriched_path())?;
    require_rows(&enriched, "aggregate")?;

    let rows = aggregate(&enriched);
    report.aggregate_groups = Some(rows.len());

    let dest = config.aggregated_path();
    write_checkpoint(&dest, AGGREGATED_HEADER, &rows)?;
    log_checkpoint(&dest, rows.len());

    Ok(rows.len())
}
