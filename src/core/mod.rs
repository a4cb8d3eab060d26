pub mod commands;
pub mod download;
pub mod harvest;
pub mod ledger;
pub mod locator;
pub mod processor;
pub mod targets;

pub use crate::domain::model::{
    DownloadOutcome, HrefLedger, Locator, MergeReport, ProcessOutcome, RunStats, SkipReason,
    TargetList,
};
pub use crate::domain::ports::{PageDriver, Storage};
pub use crate::utils::error::Result;
