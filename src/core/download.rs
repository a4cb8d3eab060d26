use crate::core::DownloadOutcome;
use crate::utils::error::{Result, ScraperError};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

/// 以檔名判斷是否已下載過的下載器
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    dir: PathBuf,
}

impl Downloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_client(Client::new(), dir)
    }

    pub fn with_client(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    /// 取 URL 路徑的最後一段作為檔名
    pub fn file_name_for(url: &str) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .map(str::to_string)
            .ok_or_else(|| ScraperError::download(url, "URL has no file name"))
    }

    pub fn target_path(&self, url: &str) -> Result<PathBuf> {
        Ok(self.dir.join(Self::file_name_for(url)?))
    }

    pub async fn download(&self, url: &str) -> Result<DownloadOutcome> {
        let file_path = self.target_path(url)?;
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if tokio::fs::try_exists(&file_path).await? {
            tracing::info!("⏭️ File already exists, skipping: {}", file_name);
            return Ok(DownloadOutcome::Skipped(file_path));
        }

        tracing::info!("⬇️ Download started: {}", file_name);
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::download(url, format!("HTTP {}", status)));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let part_path = self.dir.join(format!("{}.part", file_name));

        let written = match write_body(&mut response, &part_path).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(ScraperError::download(url, e.to_string()));
            }
        };

        tokio::fs::rename(&part_path, &file_path).await?;
        tracing::info!(
            "✅ Download complete: {} ({} bytes)",
            file_path.display(),
            written
        );
        Ok(DownloadOutcome::Downloaded(file_path))
    }
}

async fn write_body(response: &mut reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
