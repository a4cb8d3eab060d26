//! Chrome session management over the DevTools protocol (chromiumoxide).
//!
//! The browser is started as a detached process with a fixed remote debugging
//! port and a persistent profile, so a later run can attach to the same window
//! (and its cookies) instead of starting over.

use crate::config::toml_config::ScraperConfig;
use crate::core::{Locator, PageDriver};
use crate::utils::error::{Result, ScraperError};
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use reqwest::Client;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::task::JoinHandle;

/// 找出 Chrome 執行檔
pub fn find_chrome(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    if let Ok(p) = std::env::var("TRAILER_CHROME_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// 讀取 `/json/version` 取得 WebSocket 除錯位址
pub async fn discover_websocket_url(client: &Client, base_url: &str) -> Result<String> {
    let url = format!("{}/json/version", base_url.trim_end_matches('/'));
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(ScraperError::browser(format!(
            "debugger endpoint {} answered {}",
            url,
            response.status()
        )));
    }

    let json: serde_json::Value = response.json().await?;
    json["webSocketDebuggerUrl"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ScraperError::browser("No webSocketDebuggerUrl in debugger response"))
}

pub struct BrowserSession {
    _browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    is_existing: bool,
}

impl BrowserSession {
    /// 是否連上了既有的瀏覽器
    pub fn is_existing(&self) -> bool {
        self.is_existing
    }

    /// 目前控制的分頁 (CDP target id)
    pub fn target_id(&self) -> String {
        self.page.target_id().as_ref().to_string()
    }

    pub fn driver(&self) -> ChromiumDriver {
        ChromiumDriver::new(self.page.clone())
    }

    /// 中斷 CDP 連線，瀏覽器本身保持開啟
    pub fn disconnect(self) {
        self.handler_task.abort();
        tracing::debug!("Disconnected from browser; it stays open for the next run");
    }
}

pub struct BrowserManager {
    debugger_url: String,
    port: u16,
    user_data_dir: PathBuf,
    chrome_path: Option<String>,
    connect_attempts: u32,
    connect_delay: Duration,
    client: Client,
}

impl BrowserManager {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(2)).build()?;
        Ok(Self {
            debugger_url: config.browser.debugger_base_url(),
            port: config.browser.port,
            user_data_dir: config.user_data_dir(),
            chrome_path: config.browser.chrome_path.clone(),
            connect_attempts: config.browser.connect_attempts.max(1),
            connect_delay: Duration::from_millis(config.browser.connect_delay_ms),
            client,
        })
    }

    /// 先嘗試連上既有的 Chrome，失敗時啟動新的
    pub async fn create_or_attach(&self) -> Result<BrowserSession> {
        match self.attach().await {
            Ok(session) => {
                tracing::info!("🔌 Attached to existing Chrome session on port {}", self.port);
                Ok(session)
            }
            Err(e) => {
                tracing::debug!("No existing session on port {}: {}", self.port, e);
                let session = self.launch().await?;
                tracing::info!("🚀 Started a new Chrome session on port {}", self.port);
                Ok(session)
            }
        }
    }

    async fn attach(&self) -> Result<BrowserSession> {
        let ws_url = discover_websocket_url(&self.client, &self.debugger_url).await?;
        self.connect(&ws_url, true).await
    }

    async fn launch(&self) -> Result<BrowserSession> {
        let chrome = find_chrome(self.chrome_path.as_deref()).ok_or_else(|| {
            ScraperError::browser("Chrome not found. Set browser.chrome_path or TRAILER_CHROME_PATH")
        })?;

        std::fs::create_dir_all(&self.user_data_dir)?;

        // detach: 不保留 child handle，工具結束後瀏覽器仍然存在
        Command::new(&chrome)
            .arg(format!("--remote-debugging-port={}", self.port))
            .arg(format!("--user-data-dir={}", self.user_data_dir.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScraperError::browser(format!("Failed to start {}: {}", chrome.display(), e)))?;

        let mut last_error = None;
        for attempt in 1..=self.connect_attempts {
            tokio::time::sleep(self.connect_delay).await;
            match discover_websocket_url(&self.client, &self.debugger_url).await {
                Ok(ws_url) => return self.connect(&ws_url, false).await,
                Err(e) => {
                    tracing::debug!("Debugger not ready (attempt {}): {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ScraperError::browser(format!(
            "Chrome did not open port {} after {} attempts: {}",
            self.port,
            self.connect_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn connect(&self, ws_url: &str, is_existing: bool) -> Result<BrowserSession> {
        let (mut browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| ScraperError::browser(format!("Browser connect failed: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error: {}", e);
                }
            }
        });

        let page = match open_page(&mut browser).await {
            Some(page) => page,
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|e| ScraperError::browser(format!("Failed to open a tab: {}", e)))?,
        };

        Ok(BrowserSession {
            _browser: browser,
            page,
            handler_task,
            is_existing,
        })
    }
}

const PAGE_LOOKUP_ATTEMPTS: u32 = 10;
const PAGE_LOOKUP_INTERVAL: Duration = Duration::from_millis(100);

/// 沿用已開啟的分頁，優先選擇不是 about:blank 的那一個
async fn open_page(browser: &mut Browser) -> Option<Page> {
    // 連上既有瀏覽器時，連線前的分頁要先 fetch_targets 才會被追蹤
    if let Err(e) = browser.fetch_targets().await {
        tracing::warn!("Could not list open tabs: {}", e);
        return None;
    }

    for attempt in 1..=PAGE_LOOKUP_ATTEMPTS {
        match browser.pages().await {
            Ok(pages) if !pages.is_empty() => return preferred_page(pages).await,
            Ok(_) => tracing::debug!("No attached tab yet (attempt {})", attempt),
            Err(e) => tracing::debug!("Listing tabs failed (attempt {}): {}", attempt, e),
        }
        tokio::time::sleep(PAGE_LOOKUP_INTERVAL).await;
    }
    None
}

async fn preferred_page(pages: Vec<Page>) -> Option<Page> {
    for page in &pages {
        match page.url().await {
            Ok(Some(url)) if url != "about:blank" => {
                tracing::debug!("Reusing open tab at {}", url);
                return Some(page.clone());
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Could not read tab URL: {}", e),
        }
    }
    pages.into_iter().next()
}

fn cdp_error(action: &str, e: impl std::fmt::Display) -> ScraperError {
    ScraperError::browser(format!("{} failed: {}", action, e))
}

/// 連結文字比對的 JS 片段，以 JSON 字串嵌入避免跳脫問題
fn link_text_script(text: &str, body: &str) -> Result<String> {
    let literal = serde_json::to_string(text)?;
    Ok(format!(
        "(() => {{ const links = Array.from(document.querySelectorAll('a')).filter(a => (a.innerText || a.textContent || '').trim() === {}); {} }})()",
        literal, body
    ))
}

#[derive(Clone)]
pub struct ChromiumDriver {
    page: Page,
}

impl ChromiumDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| cdp_error("Script", e))?;
        result
            .into_value()
            .map_err(|e| ScraperError::browser(format!("Unexpected script result: {}", e)))
    }

    async fn css_elements(&self, selector: &str) -> Result<Vec<chromiumoxide::Element>> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| cdp_error(&format!("Query '{}'", selector), e))
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| cdp_error(&format!("Navigation to {}", url), e))?;
        Ok(())
    }

    async fn title(&self) -> Result<Option<String>> {
        self.page.get_title().await.map_err(|e| cdp_error("Title", e))
    }

    async fn current_url(&self) -> Result<Option<String>> {
        self.page.url().await.map_err(|e| cdp_error("URL", e))
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        match locator {
            Locator::Css(selector) => Ok(self.css_elements(selector).await?.len()),
            Locator::LinkText(text) => self.eval(link_text_script(text, "return links.length;")?).await,
        }
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        match locator {
            Locator::Css(selector) => {
                let element = self
                    .css_elements(selector)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| ScraperError::not_found(locator.to_string()))?;
                element
                    .click()
                    .await
                    .map_err(|e| cdp_error(&format!("Click on '{}'", selector), e))?;
                Ok(())
            }
            Locator::LinkText(text) => {
                let clicked: bool = self
                    .eval(link_text_script(
                        text,
                        "if (links.length === 0) { return false; } links[0].click(); return true;",
                    )?)
                    .await?;
                if clicked {
                    Ok(())
                } else {
                    Err(ScraperError::not_found(locator.to_string()))
                }
            }
        }
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let values = match locator {
            Locator::Css(selector) => {
                let element = self
                    .css_elements(selector)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| ScraperError::not_found(locator.to_string()))?;
                return element
                    .attribute(name)
                    .await
                    .map_err(|e| cdp_error(&format!("Attribute '{}'", name), e));
            }
            Locator::LinkText(text) => {
                let attr = serde_json::to_string(name)?;
                let body = format!(
                    "return links.length === 0 ? [] : [links[0].getAttribute({})];",
                    attr
                );
                self.eval::<Vec<Option<String>>>(link_text_script(text, &body)?).await?
            }
        };

        match values.into_iter().next() {
            Some(value) => Ok(value),
            None => Err(ScraperError::not_found(locator.to_string())),
        }
    }

    async fn attributes(
        &self,
        locator: &Locator,
        name: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        match locator {
            Locator::Css(selector) => {
                let mut values = Vec::new();
                for element in self.css_elements(selector).await?.into_iter().take(limit) {
                    match element.attribute(name).await {
                        Ok(Some(value)) => values.push(value),
                        Ok(None) => {}
                        Err(e) => tracing::debug!("Skipping element without readable {}: {}", name, e),
                    }
                }
                Ok(values)
            }
            Locator::LinkText(text) => {
                let attr = serde_json::to_string(name)?;
                let body = format!(
                    "return links.slice(0, {}).map(a => a.getAttribute({})).filter(v => v !== null);",
                    limit, attr
                );
                self.eval(link_text_script(text, &body)?).await
            }
        }
    }
}
