use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 連結文字定位的前綴，例如 `text=I AGREE`
pub const LINK_TEXT_PREFIX: &str = "text=";

/// 頁面元素定位方式
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locator {
    Css(String),
    LinkText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "{}", selector),
            Self::LinkText(text) => write!(f, "{}{}", LINK_TEXT_PREFIX, text),
        }
    }
}

impl FromStr for Locator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(text) = trimmed.strip_prefix(LINK_TEXT_PREFIX) {
            let text = text.trim();
            if text.is_empty() {
                return Err("link text locator needs a label after 'text='".to_string());
            }
            return Ok(Self::LinkText(text.to_string()));
        }
        if trimmed.is_empty() {
            return Err("selector cannot be empty".to_string());
        }
        Ok(Self::Css(trimmed.to_string()))
    }
}

impl TryFrom<String> for Locator {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    /// 檔案已存在，未發出請求
    Skipped(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyExists(PathBuf),
    NotWantedMedia(String),
    EmptySource,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists(path) => write!(f, "already downloaded: {}", path.display()),
            Self::NotWantedMedia(src) => write!(f, "not a wanted media file: {}", src),
            Self::EmptySource => write!(f, "media source attribute is empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Downloaded(PathBuf),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Downloaded(_) => self.downloaded += 1,
            ProcessOutcome::Skipped(_) => self.skipped += 1,
            ProcessOutcome::Failed(_) => self.errors += 1,
        }
    }
}

/// 每個網域一份的連結紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrefLedger {
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub total_count: usize,
    pub new_added_count: usize,
    pub hrefs: Vec<String>,
}

impl HrefLedger {
    pub fn new(domain: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            domain: domain.into(),
            created_at: now,
            last_updated: now,
            total_count: 0,
            new_added_count: 0,
            hrefs: Vec::new(),
        }
    }

    /// 去除重複並修正 total_count，保留第一次出現的順序
    pub fn normalize(&mut self) {
        let mut seen = HashSet::with_capacity(self.hrefs.len());
        self.hrefs.retain(|href| seen.insert(href.clone()));
        self.total_count = self.hrefs.len();
    }

    /// 以聯集方式合併，回傳本次新增的連結
    pub fn merge<I>(&mut self, hrefs: I, now: DateTime<Utc>) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        self.normalize();

        let mut seen: HashSet<String> = self.hrefs.iter().cloned().collect();
        let mut added = Vec::new();
        for href in hrefs {
            if seen.insert(href.clone()) {
                self.hrefs.push(href.clone());
                added.push(href);
            }
        }

        self.total_count = self.hrefs.len();
        self.new_added_count = added.len();
        self.last_updated = now;
        added
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub domain: String,
    pub ledger_path: String,
    pub added: Vec<String>,
    pub total_count: usize,
}

impl MergeReport {
    pub fn new_added_count(&self) -> usize {
        self.added.len()
    }
}

/// target.json 的內容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetList {
    #[serde(default)]
    pub sites: Vec<String>,
}
