#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use trailer_scraper::config::toml_config::WaitConfig;
use trailer_scraper::core::{Locator, PageDriver};
use trailer_scraper::{Result, ScraperConfig, ScraperError};

/// 單一頁面：標題與各定位方式對應的元素屬性
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: Option<String>,
    pub elements: HashMap<Locator, Vec<HashMap<String, String>>>,
}

impl FakePage {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            elements: HashMap::new(),
        }
    }

    /// 加入一個沒有屬性的元素
    pub fn with(mut self, locator: Locator) -> Self {
        self.elements.entry(locator).or_default().push(HashMap::new());
        self
    }

    pub fn with_attr(mut self, locator: Locator, name: &str, value: &str) -> Self {
        let mut attrs = HashMap::new();
        attrs.insert(name.to_string(), value.to_string());
        self.elements.entry(locator).or_default().push(attrs);
        self
    }
}

/// 以網址為鍵的記憶體瀏覽器，未知網址的 goto 會失敗
#[derive(Default)]
pub struct FakeDriver {
    pages: HashMap<String, FakePage>,
    current: Mutex<Option<String>>,
    clicks: Mutex<Vec<Locator>>,
    visits: Mutex<Vec<String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// 直接停在某頁，不記錄造訪
    pub fn opened_at(self, url: &str) -> Self {
        *self.current.lock().unwrap() = Some(url.to_string());
        self
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    fn with_current<T>(&self, f: impl FnOnce(Option<&FakePage>) -> T) -> T {
        let current = self.current.lock().unwrap();
        f(current.as_ref().and_then(|url| self.pages.get(url)))
    }

    fn elements(&self, locator: &Locator) -> Vec<HashMap<String, String>> {
        self.with_current(|page| {
            page.and_then(|p| p.elements.get(locator).cloned())
                .unwrap_or_default()
        })
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        if !self.pages.contains_key(url) {
            return Err(ScraperError::browser(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
        }
        self.visits.lock().unwrap().push(url.to_string());
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn title(&self) -> Result<Option<String>> {
        Ok(self.with_current(|page| page.and_then(|p| p.title.clone())))
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.elements(locator).len())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        if self.elements(locator).is_empty() {
            return Err(ScraperError::not_found(locator.to_string()));
        }
        self.clicks.lock().unwrap().push(locator.clone());
        Ok(())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let elements = self.elements(locator);
        let first = elements
            .first()
            .ok_or_else(|| ScraperError::not_found(locator.to_string()))?;
        Ok(first.get(name).cloned())
    }

    async fn attributes(&self, locator: &Locator, name: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .elements(locator)
            .iter()
            .take(limit)
            .filter_map(|attrs| attrs.get(name).cloned())
            .collect())
    }
}

pub fn agree_button() -> Locator {
    Locator::css("button.enter")
}

pub fn agree_text() -> Locator {
    Locator::link_text("I AGREE")
}

pub fn hero_image() -> Locator {
    Locator::css("main .hero img")
}

pub fn picture_image() -> Locator {
    Locator::css("main picture img")
}

pub fn trailer_source() -> Locator {
    Locator::css("video > source")
}

pub fn login_button() -> Locator {
    Locator::css("a.login")
}

pub fn login_text() -> Locator {
    Locator::link_text("Log in")
}

pub fn probe() -> Locator {
    Locator::css("#tabs a")
}

pub fn list_item() -> Locator {
    Locator::css("#list li a")
}

/// 不等待、下載到指定目錄的設定
pub fn test_config(download_dir: &std::path::Path) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.wait = WaitConfig::none();
    config.download.dir = Some(download_dir.display().to_string());
    config.selectors.agree_button = agree_button();
    config.selectors.agree_text = agree_text();
    config.selectors.login_button = login_button();
    config.selectors.login_text = login_text();
    config.selectors.probe = probe();
    config.selectors.main_content = vec![hero_image(), picture_image()];
    config.selectors.trailer_source = vec![trailer_source()];
    config.harvest.item_selector = list_item();
    config
}
