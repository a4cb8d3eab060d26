use crate::domain::model::Locator;
use crate::utils::error::{Result, ScraperError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const AGREE_BUTTON_SELECTOR: &str = "#__next > div.AgeVerificationModal__Overlay-sc-578udq-0.gheKNT > div > div.AgeVerificationModal__Modal-sc-578udq-2.khGkaQ > div > button.AgeVerificationModal__BaseButton-sc-578udq-11.AgeVerificationModal__EnterButton-sc-578udq-13.lmYncc";
const TRAILER_SOURCE_SELECTOR: &str = "#__next > main > div > div.BoundingArea__StyledBoundingArea-u294wc-0.dgQZkG > div > div.Hero-a7asd6-0.dUZdxD > div.VideoPlayerWrapper-sc-19xo1j4-0.keBsYD > div > div > div > div.plyr__video-wrapper.plyr__video-wrapper--fixed-ratio > video > source:nth-child(5)";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub browser: BrowserSettings,
    pub selectors: SelectorConfig,
    pub wait: WaitConfig,
    pub download: DownloadConfig,
    pub harvest: HarvestConfig,
    pub ledger: LedgerConfig,
    pub targets: TargetsConfig,
    /// 由 `--dev` 或 `ENV=dev` 決定，不從檔案讀取
    #[serde(skip)]
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub host: String,
    pub port: u16,
    pub user_data_dir: String,
    pub chrome_path: Option<String>,
    pub connect_attempts: u32,
    pub connect_delay_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9222,
            user_data_dir: "~/.trailer-scraper/chrome-data".to_string(),
            chrome_path: None,
            connect_attempts: 5,
            connect_delay_ms: 2000,
        }
    }
}

impl BrowserSettings {
    pub fn debugger_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub agree_button: Locator,
    pub agree_text: Locator,
    pub login_button: Locator,
    pub login_text: Locator,
    pub main_content: Vec<Locator>,
    pub trailer_source: Vec<Locator>,
    pub probe: Locator,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            agree_button: Locator::css(AGREE_BUTTON_SELECTOR),
            agree_text: Locator::link_text("I AGREE"),
            login_button: Locator::css("#page-header > div.login.page-header__hyperlinks > a"),
            login_text: Locator::link_text("로그인"),
            main_content: vec![
                Locator::css("#__next > main > div.VideoHero__Container-sc-1tldpo9-3.jwUbSK > a > div.ProgressiveImage__ImageSizeContainer-ptxr6s-0.gGktga > picture > img"),
                Locator::css("main img[src*='hero']"),
                Locator::css("main a img"),
                Locator::css("main .VideoHero__Container img"),
                Locator::css("main picture img"),
            ],
            trailer_source: vec![
                Locator::css(TRAILER_SOURCE_SELECTOR),
                Locator::css("video > source[src*='.mp4']"),
            ],
            probe: Locator::css("#projectstatus-tabBar > div > div.tabBar > div:nth-child(2) > a"),
        }
    }
}

impl SelectorConfig {
    /// 同意視窗：先試 CSS，再試按鈕文字
    pub fn consent_chain(&self) -> Vec<Locator> {
        vec![self.agree_button.clone(), self.agree_text.clone()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub page_load_ms: u64,
    pub element_wait_ms: u64,
    pub after_click_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            page_load_ms: 3000,
            element_wait_ms: 1000,
            after_click_ms: 2000,
            poll_interval_ms: 250,
        }
    }
}

impl WaitConfig {
    /// 測試用，所有等待都為零
    pub fn none() -> Self {
        Self {
            page_load_ms: 0,
            element_wait_ms: 0,
            after_click_ms: 0,
            poll_interval_ms: 0,
        }
    }

    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn after_click(&self) -> Duration {
        Duration::from_millis(self.after_click_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub dir: Option<String>,
    pub extensions: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extensions: vec![".mp4".to_string()],
        }
    }
}

impl DownloadConfig {
    pub fn is_wanted_media(&self, src: &str) -> bool {
        let lower = src.to_ascii_lowercase();
        self.extensions
            .iter()
            .any(|ext| lower.contains(&ext.to_ascii_lowercase()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub list_url: Option<String>,
    pub item_selector: Locator,
    pub attribute: String,
    pub limit: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            list_url: None,
            item_selector: Locator::css("ul li a"),
            attribute: "href".to_string(),
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub dir: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dir: "./ledger".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub file: String,
    pub dev_file: String,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            file: "target.json".to_string(),
            dev_file: "target_dev.json".to_string(),
        }
    }
}

impl ScraperConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ScraperError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ScraperError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 指定路徑則讀檔，否則使用預設值
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${DOWNLOAD_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| ScraperError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn targets_file(&self) -> &str {
        if self.dev_mode {
            &self.targets.dev_file
        } else {
            &self.targets.file
        }
    }

    /// 下載目錄：設定檔 > DOWNLOAD_DIR > ~/Downloads
    pub fn download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download.dir {
            return expand_home(dir);
        }
        if let Ok(dir) = std::env::var("DOWNLOAD_DIR") {
            if !dir.trim().is_empty() {
                return expand_home(&dir);
            }
        }
        dirs::home_dir()
            .map(|home| home.join("Downloads"))
            .unwrap_or_else(|| PathBuf::from("Downloads"))
    }

    pub fn ledger_dir(&self) -> PathBuf {
        expand_home(&self.ledger.dir)
    }

    pub fn user_data_dir(&self) -> PathBuf {
        expand_home(&self.browser.user_data_dir)
    }
}

/// 展開開頭的 `~`
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

impl Validate for ScraperConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("browser.host", &self.browser.host)?;
        validation::validate_range("browser.port", self.browser.port, 1, u16::MAX)?;
        validation::validate_path("browser.user_data_dir", &self.browser.user_data_dir)?;
        validation::validate_positive_number(
            "browser.connect_attempts",
            self.browser.connect_attempts as usize,
            1,
        )?;

        validation::validate_non_empty_list("selectors.main_content", &self.selectors.main_content)?;
        validation::validate_non_empty_list(
            "selectors.trailer_source",
            &self.selectors.trailer_source,
        )?;

        validation::validate_non_empty_list("download.extensions", &self.download.extensions)?;
        if let Some(dir) = &self.download.dir {
            validation::validate_path("download.dir", dir)?;
        }

        validation::validate_non_empty_string("harvest.attribute", &self.harvest.attribute)?;
        validation::validate_positive_number("harvest.limit", self.harvest.limit, 1)?;
        if let Some(list_url) = &self.harvest.list_url {
            validation::validate_url("harvest.list_url", list_url)?;
        }

        validation::validate_path("ledger.dir", &self.ledger.dir)?;
        validation::validate_path("targets.file", self.targets_file())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ScraperConfig::from_toml_str("").unwrap();

        assert_eq!(config.browser.port, 9222);
        assert_eq!(config.selectors.main_content.len(), 5);
        assert_eq!(config.wait.page_load_ms, 3000);
        assert_eq!(config.targets_file(), "target.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r##"
[browser]
port = 9333

[selectors]
main_content = ["main picture img", "text=Watch trailer"]

[wait]
page_load_ms = 500

[harvest]
item_selector = "#list > li > a"
limit = 20
"##;

        let config = ScraperConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.browser.port, 9333);
        assert_eq!(config.browser.host, "127.0.0.1");
        assert_eq!(
            config.selectors.main_content,
            vec![
                Locator::css("main picture img"),
                Locator::link_text("Watch trailer")
            ]
        );
        assert_eq!(config.wait.page_load_ms, 500);
        assert_eq!(config.wait.after_click_ms, 2000);
        assert_eq!(config.harvest.limit, 20);
        assert_eq!(config.harvest.attribute, "href");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TRAILER_TEST_LEDGER_DIR", "/tmp/ledgers");

        let toml_content = r#"
[ledger]
dir = "${TRAILER_TEST_LEDGER_DIR}"
"#;

        let config = ScraperConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.ledger.dir, "/tmp/ledgers");

        std::env::remove_var("TRAILER_TEST_LEDGER_DIR");
    }

    #[test]
    fn test_dev_mode_switches_target_file() {
        let mut config = ScraperConfig::default();
        config.dev_mode = true;
        assert_eq!(config.targets_file(), "target_dev.json");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[selectors]
main_content = []
"#;
        let config = ScraperConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[harvest]
list_url = "not a url"
"#;
        let config = ScraperConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_locator_is_rejected() {
        let toml_content = r#"
[selectors]
probe = ""
"#;
        assert!(ScraperConfig::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_wanted_media_extension() {
        let download = DownloadConfig::default();
        assert!(download.is_wanted_media("https://cdn.example.com/t/trailer.MP4?token=1"));
        assert!(!download.is_wanted_media("https://cdn.example.com/t/trailer.webm"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("./ledger"), PathBuf::from("./ledger"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/Downloads"), home.join("Downloads"));
        }
    }

    #[test]
    fn test_download_dir_precedence() {
        let mut config = ScraperConfig::default();

        std::env::set_var("DOWNLOAD_DIR", "/tmp/from-env");
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/from-env"));

        config.download.dir = Some("/tmp/from-config".to_string());
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/from-config"));

        config.download.dir = None;
        std::env::set_var("DOWNLOAD_DIR", "  ");
        let fallback = dirs::home_dir()
            .map(|home| home.join("Downloads"))
            .unwrap_or_else(|| PathBuf::from("Downloads"));
        assert_eq!(config.download_dir(), fallback);

        std::env::remove_var("DOWNLOAD_DIR");
        assert_eq!(config.download_dir(), fallback);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[download]\ndir = \"/tmp/trailers\"\n")
            .unwrap();

        let config = ScraperConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/trailers"));
    }
}
