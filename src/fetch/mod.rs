//! Page fetching
//!
//! Two strategies sit behind one [`PageFetcher`] interface:
//! - static: a plain HTTP GET with browser-like headers and a cookie jar
//! - browser: a headless Chromium session that scrolls until content settles
//!
//! Which one serves a URL is a pure decision made by [`select_strategy`].

mod browser;
mod selector;
mod static_fetcher;

pub use browser::BrowserFetcher;
pub use selector::{is_image_url, select_strategy};
pub use static_fetcher::{build_http_client, StaticFetcher};

use crate::config::FetchSettings;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

/// Errors raised while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Browser error for {url}: {reason}")]
    Browser { url: String, reason: String },

    #[error("Failed to build client: {0}")]
    Client(String),
}

/// How a URL is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Static,
    Browser,
}

/// Anything that can turn a URL into response bytes
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, kind: StrategyKind, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Releases long-lived sessions at the end of a run
    async fn shutdown(&self) {}
}

/// The process-wide fetcher
///
/// The browser is only launched the first time a URL actually needs it, so
/// runs over fully static archives never start Chromium.
pub struct Fetcher {
    settings: FetchSettings,
    timeout: Duration,
    static_fetcher: StaticFetcher,
    browser: OnceCell<BrowserFetcher>,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            settings: settings.clone(),
            timeout,
            static_fetcher: StaticFetcher::new(settings, timeout)?,
            browser: OnceCell::new(),
        })
    }

    async fn browser(&self) -> &BrowserFetcher {
        self.browser
            .get_or_init(|| async {
                info!("First dynamic page requested; browser fetching enabled");
                BrowserFetcher::new(&self.settings, self.timeout)
            })
            .await
    }

}

#[async_trait]
impl PageFetcher for Fetcher {
    async fn get(&self, kind: StrategyKind, url: &str) -> Result<Vec<u8>, FetchError> {
        match kind {
            StrategyKind::Static => self.static_fetcher.get(url).await,
            StrategyKind::Browser => self.browser().await.get(url).await,
        }
    }

    /// Closes the browser if one was started
    async fn shutdown(&self) {
        if let Some(browser) = self.browser.get() {
            browser.shutdown().await;
        }
    }
}
