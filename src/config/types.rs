use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::ConfigError;

/// Main configuration structure for News-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

/// What to collect and how hard to push
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Archive identifiers to collect; empty means every registered archive
    pub archives: Vec<String>,

    /// First day of the crawl window (defaults to today)
    #[serde(rename = "begin-date", alias = "begin_date", deserialize_with = "deserialize_date")]
    pub begin_date: Option<NaiveDate>,

    /// Last day of the crawl window (defaults to today)
    #[serde(rename = "end-date", alias = "end_date", deserialize_with = "deserialize_date")]
    pub end_date: Option<NaiveDate>,

    /// Per-request timeout in seconds
    pub timeout: f64,

    /// Worker count; defaults to twice the number of selected archives
    pub workers: Option<usize>,

    /// Records per enrichment and insert batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Drop frontier dates that already have stored records
    #[serde(rename = "skip-done-dates")]
    pub skip_done_dates: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            archives: Vec::new(),
            begin_date: None,
            end_date: None,
            timeout: 10.0,
            workers: None,
            batch_size: 32,
            skip_done_dates: false,
        }
    }
}

impl CrawlSettings {
    /// Per-request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }
}

/// Static and browser fetch tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Seconds before the static HTTP session is rebuilt
    #[serde(rename = "session-lifetime-secs")]
    pub session_lifetime_secs: u64,

    /// Browser fetches served before the browser process is restarted
    #[serde(rename = "browser-restart-after")]
    pub browser_restart_after: u32,

    #[serde(rename = "scroll-pause-ms")]
    pub scroll_pause_ms: u64,

    #[serde(rename = "max-scrolls")]
    pub max_scrolls: u32,

    /// Candidate selectors for the cookie-consent accept button
    #[serde(rename = "cookie-consent-selectors")]
    pub cookie_consent_selectors: Vec<String>,

    /// Candidate selectors for "load more" buttons on infinite listings
    #[serde(rename = "load-more-selectors")]
    pub load_more_selectors: Vec<String>,

    /// Chrome/Chromium binary; autodetected when unset
    #[serde(rename = "chrome-executable")]
    pub chrome_executable: Option<String>,

    /// Launch Chromium without its sandbox, needed when running as root
    /// inside a container
    #[serde(rename = "no-sandbox")]
    pub no_sandbox: bool,
}

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:98.0) Gecko/20100101 Firefox/98.0";

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            session_lifetime_secs: 3600,
            browser_restart_after: 10,
            scroll_pause_ms: 1000,
            max_scrolls: 30,
            cookie_consent_selectors: vec![
                "#didomi-notice-agree-button".to_string(),
                "#onetrust-accept-btn-handler".to_string(),
                "button[aria-label='Accepter & Fermer']".to_string(),
            ],
            load_more_selectors: vec![
                "button.load-more".to_string(),
                "a.load-more".to_string(),
                "#load-more".to_string(),
            ],
            chrome_executable: None,
            no_sandbox: false,
        }
    }
}

impl FetchSettings {
    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_secs)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

/// Where records and images land
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Connections kept open; raised to the worker count when lower
    #[serde(rename = "pool-size")]
    pub pool_size: usize,

    /// Root directory for downloaded images
    #[serde(rename = "image-root")]
    pub image_root: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: "news_harvest.db".to_string(),
            pool_size: 4,
            image_root: "images".to_string(),
        }
    }
}

/// Remote embedding service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Full endpoint URL, e.g. `http://localhost:8000/v1/embeddings`.
    /// Records are stored without vectors when unset.
    pub url: Option<String>,

    /// Timeout for one batch call, in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parses a crawl date given as `dd-mm-yyyy` or ISO `yyyy-mm-dd`
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| ConfigError::InvalidDate(value.to_string()))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
