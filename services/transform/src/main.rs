//! Transform Service - Consolidates quarterly expense disclosures into KPIs
//!
//! Responsibilities:
//! - Decode extracted source files (semicolon CSV/TXT in Latin-1, XLS/XLSX)
//! - Resolve columns heuristically and normalize rows into expense records
//! - Validate CNPJ check digits, values and names
//! - Enrich with the active operators registry (many-to-one join)
//! - Aggregate per operator and UF
//!
//! Every stage writes a checkpoint, so any stage can be re-run on its own.
//!
//! Usage:
//!   # Full run:
//!   cargo run --bin transform -- --base-dir /srv/ans
//!
//!   # Single stage from existing checkpoints:
//!   cargo run --bin transform -- --stage aggregate

mod aggregate;
mod checkpoint;
mod config;
mod enrich;
mod error;
mod identifier;
mod normalize;
mod period;
mod pipeline;
mod registry;
mod report;
mod schema;
mod table;
mod validate;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use config::Config;
use report::RunReport;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Consolidate,
    Enrich,
    Aggregate,
    All,
}

impl Stage {
    fn includes(self, other: Stage) -> bool {
        self == Stage::All || self == other
    }
}

#[derive(Parser, Debug)]
#[command(name = "transform", about = "Consolidates, validates, enriches and aggregates expense disclosures")]
struct Args {
    /// Stage to run
    #[arg(long, value_enum, default_value = "all")]
    stage: Stage,

    /// Base directory holding data/intermediate, data/raw and data/output
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Registry snapshot (defaults to data/raw/Relatorio_cadop.csv)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Where to write the run report (defaults to data/output/run_report.json)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("transform=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(stage: Stage, config: &Config, report: &mut RunReport) -> Result<()> {
    if stage.includes(Stage::Consolidate) {
        tracing::info!("stage 1: consolidate");
        pipeline::consolidate(config, report)?;
    }
    if stage.includes(Stage::Enrich) {
        tracing::info!("stage 2: validate and enrich");
        pipeline::enrich_stage(config, report)?;
    }
    if stage.includes(Stage::Aggregate) {
        tracing::info!("stage 3: aggregate");
        pipeline::aggregate_stage(config, report)?;
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("\n=== Transform Summary ===");
    println!("Run ID: {}", report.run_id);
    if !report.files.is_empty() {
        println!("Files accepted: {}", report.accepted());
        println!("Files skipped: {}", report.skipped());
    }
    if let Some(rows) = report.consolidated_rows {
        println!("Consolidated rows: {}", rows);
    }
    if let Some(v) = &report.validation {
        println!("Valid rows: {} of {}", v.valid_rows, v.input_rows);
    }
    if let Some(e) = &report.enrichment {
        println!(
            "Enriched rows: {} ({} without registry)",
            e.enriched_rows, e.unmatched_rows
        );
    }
    if let Some(groups) = report.aggregate_groups {
        println!("Aggregated groups: {}", groups);
    }
}

/// A report that cannot be written is logged, never allowed to mask the
/// run's own outcome.
fn save_report(report: &RunReport, path: &Path) -> bool {
    match report.save(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), status = ?report.status, "run report saved");
            true
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %format!("{:#}", e), "failed to save run report");
            false
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let args = Args::parse();
    let config = Config::from_env(args.base_dir, args.registry);

    tracing::info!(
        base_dir = %config.base_dir.display(),
        stage = ?args.stage,
        "starting transform"
    );

    let mut report = RunReport::start();
    let result = run(args.stage, &config, &mut report);
    report.finish(&result);

    let report_path = args.report.unwrap_or_else(|| config.report_path());
    save_report(&report, &report_path);

    print_summary(&report);
    result
}
