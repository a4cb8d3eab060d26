use crate::core::TargetList;
use crate::utils::error::{Result, ScraperError};
use crate::utils::validation::validate_any_url;
use std::path::Path;

/// 讀取 `{"sites": [...]}` 格式的目標清單。
///
/// 格式錯誤的網址只記警告並原樣保留，由批次處理計為錯誤；
/// 全部都不可用時才回傳錯誤。
pub fn load_targets<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScraperError::MissingConfigError {
            field: path.display().to_string(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let targets: TargetList = serde_json::from_str(&content)?;

    let field = format!("{}: sites", path.display());
    let usable = validate_any_url(&field, &targets.sites)?;
    tracing::debug!("{} of {} sites in {} are usable", usable, targets.sites.len(), path.display());

    Ok(targets.sites)
}
