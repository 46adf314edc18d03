use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a stage. Per-file problems are not errors; they end up
/// as skipped entries in the run report.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("checkpoint not found: {0} (run the previous stage first)")]
    MissingCheckpoint(PathBuf),

    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("no data produced: stage '{stage}' received zero rows")]
    EmptyDataset { stage: &'static str },

    #[error("registry cardinality violated: identifier {identifier} appears {count} times")]
    RegistryCardinality { identifier: String, count: usize },

    #[error("registry has no {0} column")]
    MissingRegistryColumn(&'static str),
}
