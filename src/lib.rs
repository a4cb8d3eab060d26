pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::chromium::{BrowserManager, BrowserSession, ChromiumDriver};
pub use config::{cli::LocalStorage, toml_config::ScraperConfig, CliConfig};
pub use core::{
    commands::CommandHandler, download::Downloader, harvest::LinkHarvester, ledger::LedgerStore,
    processor::PageProcessor,
};
pub use utils::error::{Result, ScraperError};

#[cfg(feature = "object-store")]
pub use adapters::object_store::{ObjectStoreConfig, S3ObjectStore};
