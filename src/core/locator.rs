//! Ordered selector fallback chains.
//!
//! A chain holds several locators for the same page element. Each one is
//! polled for up to `wait` before moving on to the next; the first locator
//! that turns up on the page wins.

use crate::core::{Locator, PageDriver};
use crate::utils::error::{Result, ScraperError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct FallbackChain {
    locators: Vec<Locator>,
    wait: Duration,
    poll: Duration,
}

impl FallbackChain {
    pub fn new(locators: Vec<Locator>) -> Self {
        Self {
            locators,
            wait: Duration::ZERO,
            poll: Duration::from_millis(250),
        }
    }

    /// 每個定位方式的最長等待時間
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    fn describe(&self) -> String {
        self.locators
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// 依序嘗試，回傳第一個出現在頁面上的定位方式
    pub async fn resolve<D>(&self, driver: &D) -> Result<Option<&Locator>>
    where
        D: PageDriver + ?Sized,
    {
        for locator in &self.locators {
            tracing::debug!("Trying selector: {}", locator);
            match wait_for_presence(driver, locator, self.wait, self.poll).await {
                Ok(true) => {
                    tracing::debug!("Found element: {}", locator);
                    return Ok(Some(locator));
                }
                Ok(false) => continue,
                Err(e) => {
                    tracing::debug!("Selector {} failed: {}", locator, e);
                    continue;
                }
            }
        }
        Ok(None)
    }

    pub async fn click_first<D>(&self, driver: &D) -> Result<Locator>
    where
        D: PageDriver + ?Sized,
    {
        let mut last_error = None;
        for locator in &self.locators {
            match wait_for_presence(driver, locator, self.wait, self.poll).await {
                Ok(true) => match driver.click(locator).await {
                    Ok(()) => {
                        tracing::debug!("Clicked element: {}", locator);
                        return Ok(locator.clone());
                    }
                    // 元素可能在等待與點擊之間消失，換下一個
                    Err(e) => {
                        tracing::debug!("Click on {} failed: {}", locator, e);
                        last_error = Some(e);
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!("Selector {} failed: {}", locator, e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            tracing::debug!("Last fallback error: {}", e);
        }
        Err(ScraperError::not_found(self.describe()))
    }

    pub async fn attribute_first<D>(&self, driver: &D, name: &str) -> Result<Option<String>>
    where
        D: PageDriver + ?Sized,
    {
        match self.resolve(driver).await? {
            Some(locator) => driver.attribute(locator, name).await,
            None => Err(ScraperError::not_found(self.describe())),
        }
    }
}

/// 輪詢直到元素出現或逾時。`timeout` 為零時只檢查一次。
pub async fn wait_for_presence<D>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<bool>
where
    D: PageDriver + ?Sized,
{
    let deadline = Instant::now() + timeout;
    loop {
        if driver.count(locator).await? > 0 {
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }

        let remaining = deadline - now;
        let step = if poll.is_zero() { remaining } else { poll.min(remaining) };
        tokio::time::sleep(step).await;
    }
}
