//! Application configuration structures.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Source endpoints and site-specific extraction settings
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP and retry behavior settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Poll loop settings
    #[serde(default)]
    pub poll: PollConfig,

    /// State persistence settings
    #[serde(default)]
    pub state: StateConfig,

    /// Notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.api_url.trim().is_empty() {
            return Err(AppError::config("source.api_url is empty"));
        }
        if self.source.page_url.trim().is_empty() {
            return Err(AppError::config("source.page_url is empty"));
        }
        url::Url::parse(&self.source.base_url)
            .map_err(|e| AppError::config(format!("source.base_url is not a valid URL: {e}")))?;
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::config("source.user_agent is empty"));
        }
        if self.source.selectors.row_selector.trim().is_empty() {
            return Err(AppError::config("source.selectors.row_selector is empty"));
        }
        if self.source.selectors.title_selector.trim().is_empty() {
            return Err(AppError::config("source.selectors.title_selector is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::config("fetch.timeout_secs must be > 0"));
        }
        if self.poll.interval_secs == 0 {
            return Err(AppError::config("poll.interval_secs must be > 0"));
        }
        if self.state.path.trim().is_empty() {
            return Err(AppError::config("state.path is empty"));
        }
        if self.notify.endpoint.trim().is_empty() {
            return Err(AppError::config("notify.endpoint is empty"));
        }
        Ok(())
    }
}

/// Source endpoints and site-specific extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Structured query endpoint returning the latest publications (primary)
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Full listing page scraped when the primary channel is exhausted
    #[serde(default = "defaults::page_url")]
    pub page_url: String,

    /// Base URL for resolving relative links found in markup
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Field names in the structured API response
    #[serde(default)]
    pub api_fields: ApiFields,

    /// CSS selectors for markup extraction
    #[serde(default)]
    pub selectors: PageSelectors,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            page_url: defaults::page_url(),
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            api_fields: ApiFields::default(),
            selectors: PageSelectors::default(),
        }
    }
}

/// Field names used to pull the latest record out of the API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFields {
    /// Key of the records array ("" means the response is a top-level array)
    #[serde(default = "defaults::records_field")]
    pub records: String,

    /// Title field on a record
    #[serde(default = "defaults::title_field")]
    pub title: String,

    /// Link field on a record
    #[serde(default = "defaults::link_field")]
    pub link: String,

    /// Date field on a record
    #[serde(default = "defaults::date_field")]
    pub date: String,

    /// Field holding an entity-escaped markup fragment of the record
    #[serde(default = "defaults::fragment_field")]
    pub fragment: String,
}

impl Default for ApiFields {
    fn default() -> Self {
        Self {
            records: defaults::records_field(),
            title: defaults::title_field(),
            link: defaults::link_field(),
            date: defaults::date_field(),
            fragment: defaults::fragment_field(),
        }
    }
}

/// CSS selectors for extracting the first entry from listing markup.
///
/// These track the external site's markup and are expected to need
/// periodic maintenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSelectors {
    /// Selector for one listing entry
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Selector for the title heading within an entry
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// Selector for the link element within an entry
    #[serde(default = "defaults::link_selector")]
    pub link_selector: String,

    /// Attribute holding the link target
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// Selector for a time-like date element within an entry
    #[serde(default = "defaults::date_selector")]
    pub date_selector: String,

    /// Label text preceding the date in plain text (fallback lookup)
    #[serde(default = "defaults::date_label")]
    pub date_label: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            row_selector: defaults::row_selector(),
            title_selector: defaults::title_selector(),
            link_selector: defaults::link_selector(),
            link_attr: defaults::link_attr(),
            date_selector: defaults::date_selector(),
            date_label: defaults::date_label(),
        }
    }
}

/// HTTP client and retry behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-call timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Additional primary attempts after the first failure
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in milliseconds (scaled linearly by
    /// attempt number; tuned against the source's rate limiting, no jitter)
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between cycles in seconds, measured from cycle completion
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
        }
    }
}

/// State persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path of the single-slot state file
    #[serde(default = "defaults::state_path")]
    pub path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: defaults::state_path(),
        }
    }
}

/// Notification settings (non-secret part; credentials come from the
/// environment, see [`EnvSettings`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Mail API endpoint the dispatcher POSTs to
    #[serde(default = "defaults::notify_endpoint")]
    pub endpoint: String,

    /// Prefix for notification subjects
    #[serde(default = "defaults::subject_prefix")]
    pub subject_prefix: String,

    /// Title keywords gating notifications (empty = notify on every change)
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::notify_endpoint(),
            subject_prefix: defaults::subject_prefix(),
            keywords: Vec::new(),
        }
    }
}

/// Process-level settings read from the environment once at startup.
///
/// Missing required variables are a fatal startup condition: the process
/// must not begin polling without them.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    /// Credential for the mail API
    pub api_key: String,

    /// Sender identity
    pub sender: String,

    /// Recipient addresses
    pub recipients: Vec<String>,

    /// Optional scheduled self-termination, for cron-style invocation
    pub max_runtime_minutes: Option<u64>,
}

impl EnvSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        let api_key = require_var("PUBWATCH_API_KEY")?;
        let sender = require_var("PUBWATCH_SENDER")?;

        let recipients: Vec<String> = require_var("PUBWATCH_RECIPIENTS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(AppError::config(
                "PUBWATCH_RECIPIENTS contains no addresses",
            ));
        }

        let max_runtime_minutes = match env::var("PUBWATCH_MAX_RUNTIME_MINUTES") {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                AppError::config(format!(
                    "PUBWATCH_MAX_RUNTIME_MINUTES is not a number: {raw}"
                ))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            api_key,
            sender,
            recipients,
            max_runtime_minutes,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::config(format!(
            "required environment variable {name} is not set"
        ))),
    }
}

mod defaults {
    // Source defaults
    pub fn api_url() -> String {
        "https://www.example.org/api/search?type=publication&sort=newest&size=1".into()
    }
    pub fn page_url() -> String {
        "https://www.example.org/publications".into()
    }
    pub fn base_url() -> String {
        "https://www.example.org".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; pubwatch/0.1)".into()
    }

    // API field defaults
    pub fn records_field() -> String {
        "results".into()
    }
    pub fn title_field() -> String {
        "title".into()
    }
    pub fn link_field() -> String {
        "url".into()
    }
    pub fn date_field() -> String {
        "date".into()
    }
    pub fn fragment_field() -> String {
        "rendered".into()
    }

    // Selector defaults
    pub fn row_selector() -> String {
        "li.views-row".into()
    }
    pub fn title_selector() -> String {
        "h3".into()
    }
    pub fn link_selector() -> String {
        "a".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn date_selector() -> String {
        "time".into()
    }
    pub fn date_label() -> String {
        "Published date".into()
    }

    // Fetch defaults
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        2000
    }

    // Poll defaults
    pub fn interval() -> u64 {
        900
    }

    // State defaults
    pub fn state_path() -> String {
        "storage/last_seen.json".into()
    }

    // Notify defaults
    pub fn notify_endpoint() -> String {
        "https://api.mail.example.com/v1/send".into()
    }
    pub fn subject_prefix() -> String {
        "[pubwatch]".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_api_url() {
        let mut config = Config::default();
        config.source.api_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.poll.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.source.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [poll]
            interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.source.selectors.link_attr, "href");
    }
}
