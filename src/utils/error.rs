use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Browser error: {message}")]
    BrowserError { message: String },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Download failed for {url}: {message}")]
    DownloadError { url: String, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Ledger error: {message}")]
    LedgerError { message: String },

    #[error("Object storage error: {message}")]
    ObjectStoreError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Browser,
    Element,
    Network,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScraperError {
    pub fn browser(message: impl Into<String>) -> Self {
        Self::BrowserError {
            message: message.into(),
        }
    }

    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownloadError {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BrowserError { .. } => ErrorCategory::Browser,
            Self::ElementNotFound { .. } => ErrorCategory::Element,
            Self::DownloadError { .. } | Self::HttpError(_) | Self::InvalidUrl { .. } => {
                ErrorCategory::Network
            }
            Self::IoError(_) | Self::LedgerError { .. } | Self::ObjectStoreError { .. } => {
                ErrorCategory::Storage
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 頁面上找不到元素是常態，僅作警告
            Self::ElementNotFound { .. } => ErrorSeverity::Low,
            Self::DownloadError { .. } | Self::HttpError(_) | Self::InvalidUrl { .. } => {
                ErrorSeverity::Medium
            }
            Self::SerializationError(_)
            | Self::LedgerError { .. }
            | Self::ObjectStoreError { .. }
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorSeverity::High,
            Self::BrowserError { .. } | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Browser => {
                "Check that Chrome is installed and the remote debugging port is free"
            }
            ErrorCategory::Element => {
                "The page layout may have changed; update the selectors in the config file"
            }
            ErrorCategory::Network => "Check the network connection and the asset URL, then retry",
            ErrorCategory::Storage => {
                "Check that the output directory or bucket exists and is writable"
            }
            ErrorCategory::Configuration => "Review the config file and command-line flags",
            ErrorCategory::Data => "The JSON file is malformed; fix or remove it and retry",
        }
    }

    /// 依嚴重程度決定程式結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::BrowserError { message } => format!("Browser session problem: {}", message),
            Self::ElementNotFound { selector } => {
                format!("Could not find the element on the page ({})", selector)
            }
            Self::DownloadError { url, .. } => format!("Could not download {}", url),
            Self::MissingConfigError { field } => {
                format!("Required setting '{}' is missing", field)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
