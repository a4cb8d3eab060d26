use crate::config::toml_config::HarvestConfig;
use crate::core::ledger::LedgerStore;
use crate::core::{Locator, MergeReport, PageDriver, Storage};
use crate::utils::error::{Result, ScraperError};
use std::collections::HashSet;
use url::Url;

/// 將清單頁面上的連結轉成絕對網址，去除重複但保留順序
pub fn resolve_hrefs(base: &Url, raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for value in raw {
        let value = value.trim();
        if value.is_empty() || value.starts_with('#') {
            continue;
        }
        let lower = value.to_ascii_lowercase();
        if lower.starts_with("javascript:") || lower.starts_with("mailto:") {
            continue;
        }

        let absolute = match base.join(value) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping unresolvable href {}: {}", value, e);
                continue;
            }
        };
        if !matches!(absolute.scheme(), "http" | "https") {
            continue;
        }

        let absolute = absolute.to_string();
        if seen.insert(absolute.clone()) {
            resolved.push(absolute);
        }
    }

    resolved
}

pub fn domain_of(url: &Url) -> Result<String> {
    let host = url.host_str().ok_or_else(|| ScraperError::InvalidUrl {
        url: url.to_string(),
        reason: "URL has no host".to_string(),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

pub struct LinkHarvester<S: Storage> {
    item_selector: Locator,
    attribute: String,
    limit: usize,
    ledger: LedgerStore<S>,
}

impl<S: Storage> LinkHarvester<S> {
    pub fn new(config: &HarvestConfig, ledger: LedgerStore<S>) -> Self {
        Self {
            item_selector: config.item_selector.clone(),
            attribute: config.attribute.clone(),
            limit: config.limit,
            ledger,
        }
    }

    /// 收集目前頁面上的連結（最多 limit 筆）
    pub async fn collect<D>(&self, driver: &D, page_url: &Url) -> Result<Vec<String>>
    where
        D: PageDriver + ?Sized,
    {
        let raw = driver
            .attributes(&self.item_selector, &self.attribute, self.limit)
            .await?;
        tracing::debug!(
            "Found {} raw values for {} on {}",
            raw.len(),
            self.item_selector,
            page_url
        );
        Ok(resolve_hrefs(page_url, &raw))
    }

    /// 收集目前頁面的連結並合併進該網域的紀錄
    pub async fn harvest<D>(&self, driver: &D) -> Result<MergeReport>
    where
        D: PageDriver + ?Sized,
    {
        let current = driver
            .current_url()
            .await?
            .ok_or_else(|| ScraperError::browser("current page has no URL"))?;
        let page_url = Url::parse(&current).map_err(|e| ScraperError::InvalidUrl {
            url: current.clone(),
            reason: e.to_string(),
        })?;

        let domain = domain_of(&page_url)?;
        let hrefs = self.collect(driver, &page_url).await?;
        tracing::info!("🔗 Collected {} links from {}", hrefs.len(), page_url);

        self.ledger.merge_and_save(&domain, hrefs).await
    }
}
