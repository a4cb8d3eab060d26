use crate::config::toml_config::{DownloadConfig, ScraperConfig, SelectorConfig, WaitConfig};
use crate::core::download::Downloader;
use crate::core::locator::FallbackChain;
use crate::core::{DownloadOutcome, Locator, PageDriver, ProcessOutcome, RunStats, SkipReason};
use crate::utils::error::Result;
use crate::utils::validation::validate_url;
use std::time::Duration;

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// 單一頁面的處理流程：同意視窗 → 主要內容 → 預告片下載
pub struct PageProcessor<D: PageDriver> {
    driver: D,
    selectors: SelectorConfig,
    wait: WaitConfig,
    download: DownloadConfig,
    downloader: Downloader,
}

impl<D: PageDriver> PageProcessor<D> {
    pub fn new(driver: D, config: &ScraperConfig) -> Self {
        let downloader = Downloader::new(config.download_dir());
        Self::with_downloader(driver, config, downloader)
    }

    pub fn with_downloader(driver: D, config: &ScraperConfig, downloader: Downloader) -> Self {
        Self {
            driver,
            selectors: config.selectors.clone(),
            wait: config.wait.clone(),
            download: config.download.clone(),
            downloader,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn selectors(&self) -> &SelectorConfig {
        &self.selectors
    }

    fn chain(&self, locators: Vec<Locator>, wait: Duration) -> FallbackChain {
        FallbackChain::new(locators)
            .with_wait(wait)
            .with_poll_interval(self.wait.poll_interval())
    }

    /// 有同意視窗就點掉；沒有時回傳 false
    pub async fn dismiss_consent(&self) -> Result<bool> {
        let chain = self.chain(self.selectors.consent_chain(), Duration::ZERO);
        match chain.resolve(&self.driver).await? {
            Some(locator) => {
                tracing::debug!("Consent button found ({}), clicking", locator);
                self.driver.click(locator).await?;
                pause(self.wait.after_click()).await;
                Ok(true)
            }
            None => {
                tracing::debug!("No consent button, moving on");
                Ok(false)
            }
        }
    }

    pub async fn click_main_content(&self) -> Result<Locator> {
        let chain = self.chain(self.selectors.main_content.clone(), self.wait.element_wait());
        let locator = chain.click_first(&self.driver).await?;
        pause(self.wait.after_click()).await;
        Ok(locator)
    }

    pub async fn trailer_source(&self) -> Result<Option<String>> {
        let chain = self.chain(self.selectors.trailer_source.clone(), Duration::ZERO);
        chain.attribute_first(&self.driver, "src").await
    }

    /// 依來源網址決定下載或略過
    pub async fn fetch_media(&self, src: &str) -> ProcessOutcome {
        let src = src.trim();
        if src.is_empty() {
            return ProcessOutcome::Skipped(SkipReason::EmptySource);
        }
        if !self.download.is_wanted_media(src) {
            tracing::debug!("Not a wanted media file, skipping: {}", src);
            return ProcessOutcome::Skipped(SkipReason::NotWantedMedia(src.to_string()));
        }

        match self.downloader.download(src).await {
            Ok(DownloadOutcome::Downloaded(path)) => ProcessOutcome::Downloaded(path),
            Ok(DownloadOutcome::Skipped(path)) => {
                ProcessOutcome::Skipped(SkipReason::AlreadyExists(path))
            }
            Err(e) => {
                tracing::error!("❌ {}", e);
                ProcessOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn do_process(&self) -> ProcessOutcome {
        // 1. 同意視窗
        if let Err(e) = self.dismiss_consent().await {
            tracing::warn!("Consent dialog could not be dismissed: {}", e);
        }

        // 2. 主要內容
        match self.click_main_content().await {
            Ok(locator) => tracing::debug!("Main content clicked via {}", locator),
            Err(e) => tracing::debug!("Main content not found: {}", e),
        }

        // 3. 預告片來源
        match self.trailer_source().await {
            Ok(Some(src)) => {
                tracing::debug!("Trailer source found: {}", src);
                self.fetch_media(&src).await
            }
            Ok(None) => ProcessOutcome::Skipped(SkipReason::EmptySource),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Trailer source not found");
                ProcessOutcome::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!("❌ Reading trailer source failed: {}", e);
                ProcessOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn visit_and_process(&self, urls: &[String]) -> RunStats {
        let mut stats = RunStats {
            total: urls.len(),
            ..RunStats::default()
        };

        for url in urls {
            tracing::info!("🌐 Visiting {}", url);
            let outcome = match validate_url("sites", url) {
                Err(e) => ProcessOutcome::Failed(e.to_string()),
                Ok(()) => match self.driver.goto(url).await {
                    Ok(()) => {
                        pause(self.wait.page_load()).await;
                        self.do_process().await
                    }
                    Err(e) => ProcessOutcome::Failed(e.to_string()),
                },
            };

            match &outcome {
                ProcessOutcome::Downloaded(path) => {
                    tracing::info!("✅ {} done: {}", url, path.display())
                }
                ProcessOutcome::Skipped(reason) => tracing::info!("⏭️ {} skipped: {}", url, reason),
                ProcessOutcome::Failed(message) => {
                    tracing::error!("❌ {} failed: {}", url, message)
                }
            }
            stats.record(&outcome);
        }

        tracing::info!("=== Run statistics ===");
        tracing::info!("Total sites: {}", stats.total);
        tracing::info!("Downloaded: {}", stats.downloaded);
        tracing::info!("Skipped: {}", stats.skipped);
        tracing::info!("Errors: {}", stats.errors);
        tracing::info!("======================");

        stats
    }
}
