use crate::config::{ClinicConfig, FailurePolicy};
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Summary,
    Json,
    ServicesCsv,
    DoctorsCsv,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "clinic-etl")]
#[command(about = "Scrape clinic doctors, departments and price list into one snapshot")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override source.base_url")]
    pub base_url: Option<String>,

    #[arg(long, help = "Override extract.detail_concurrency")]
    pub detail_concurrency: Option<usize>,

    #[arg(long, help = "Override source.timeout_seconds")]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Fail the whole refresh when any assembler fails")]
    pub legacy_abort: bool,

    #[arg(long, value_enum, default_value = "summary")]
    pub format: OutputFormat,

    #[arg(long, help = "Case-insensitive keyword filter applied to the printed snapshot")]
    pub search: Option<String>,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 載入設定檔（若有）並套用命令列覆寫
    pub fn resolve(&self) -> Result<ClinicConfig> {
        let mut config = match &self.config {
            Some(path) => ClinicConfig::from_file(path)?,
            None => ClinicConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.source.base_url = base_url.clone();
        }
        if let Some(concurrency) = self.detail_concurrency {
            config.extract.detail_concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout_secs {
            config.source.timeout_seconds = timeout;
        }
        if self.legacy_abort {
            config.refresh.failure_policy = FailurePolicy::AbortOnAny;
        }

        Ok(config)
    }
}
