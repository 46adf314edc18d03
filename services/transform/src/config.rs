use std::path::PathBuf;

pub const CONSOLIDATED_FILE: &str = "consolidado_despesas.csv";
pub const ENRICHED_FILE: &str = "despesas_validas_enriquecidas.csv";
pub const AGGREGATED_FILE: &str = "despesas_agregadas.csv";
pub const REPORT_FILE: &str = "run_report.json";
pub const DEFAULT_REGISTRY_FILE: &str = "Relatorio_cadop.csv";

/// Directory layout for a run. Built once and passed to every stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    /// Extracted source files, one folder per `<year>_<quarter>_...` archive.
    pub intermediate_dir: PathBuf,
    /// Checkpoints and run report.
    pub output_dir: PathBuf,
    /// Registry snapshot (semicolon-separated, Latin-1).
    pub registry_path: PathBuf,
}

impl Config {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let data = base_dir.join("data");
        Self {
            intermediate_dir: data.join("intermediate"),
            output_dir: data.join("output"),
            registry_path: data.join("raw").join(DEFAULT_REGISTRY_FILE),
            base_dir,
        }
    }

    /// `TRANSFORM_BASE_DIR` and `TRANSFORM_REGISTRY_PATH`, falling back to the
    /// current directory layout. Explicit arguments win over the environment.
    pub fn from_env(base_dir: Option<PathBuf>, registry_path: Option<PathBuf>) -> Self {
        let base_dir = base_dir
            .or_else(|| std::env::var("TRANSFORM_BASE_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::new(base_dir);
        if let Some(path) =
            registry_path.or_else(|| std::env::var("TRANSFORM_REGISTRY_PATH").ok().map(PathBuf::from))
        {
            config.registry_path = path;
        }
        config
    }

    pub fn consolidated_path(&self) -> PathBuf {
        self.output_dir.join(CONSOLIDATED_FILE)
    }

    pub fn enriched_path(&self) -> PathBuf {
        self.output_dir.join(ENRICHED_FILE)
    }

    pub fn aggregated_path(&self) -> PathBuf {
        self.output_dir.join(AGGREGATED_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }
}
