pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use clap::Parser;
use toml_config::ScraperConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "trailer-scraper")]
#[command(about = "Browser automation tool that downloads trailers and keeps per-domain link ledgers")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the target list file
    #[arg(long)]
    pub targets: Option<String>,

    #[arg(long)]
    pub download_dir: Option<String>,

    #[arg(long)]
    pub ledger_dir: Option<String>,

    /// Remote debugging port of the controlled browser
    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub user_data_dir: Option<String>,

    /// Use the dev target file and debug logging (same as ENV=dev)
    #[arg(long)]
    pub dev: bool,

    /// Run a single menu command and exit
    #[arg(long)]
    pub run: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl CliConfig {
    pub fn dev_mode(&self) -> bool {
        self.dev || is_dev_env()
    }

    /// 載入設定檔並套用命令列覆蓋
    pub fn resolve(&self) -> Result<ScraperConfig> {
        let mut config = ScraperConfig::load(self.config.as_deref())?;
        config.dev_mode = self.dev_mode();

        if let Some(targets) = &self.targets {
            if config.dev_mode {
                config.targets.dev_file = targets.clone();
            } else {
                config.targets.file = targets.clone();
            }
        }
        if let Some(dir) = &self.download_dir {
            config.download.dir = Some(dir.clone());
        }
        if let Some(dir) = &self.ledger_dir {
            config.ledger.dir = dir.clone();
        }
        if let Some(port) = self.port {
            config.browser.port = port;
        }
        if let Some(dir) = &self.user_data_dir {
            config.browser.user_data_dir = dir.clone();
        }

        Ok(config)
    }
}

pub fn is_dev_env() -> bool {
    std::env::var("ENV")
        .map(|v| v.eq_ignore_ascii_case("dev"))
        .unwrap_or(false)
}

/// `--verbose`、`--dev` 或 `ENV=dev` 時輸出 debug 日誌
pub fn debug_logging(verbose: bool, dev_flag: bool) -> bool {
    verbose || dev_flag || is_dev_env()
}
