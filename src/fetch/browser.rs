//! Browser fetching
//!
//! Renders JavaScript-dependent pages in headless Chromium. A single browser
//! process is shared by all workers and driven one page at a time; it is
//! restarted after a fixed number of fetches to keep its memory bounded.

use crate::config::FetchSettings;
use crate::fetch::FetchError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const PAGE_HEIGHT: &str = "document.body.scrollHeight";

/// Bookkeeping for one browser process
#[derive(Debug, Default)]
struct SessionState {
    fetches: u32,
    consent_dismissed: bool,
}

impl SessionState {
    fn is_expired(&self, restart_after: u32) -> bool {
        self.fetches >= restart_after
    }

    fn record_fetch(&mut self) {
        self.fetches += 1;
    }
}

/// What has to happen to the process before the next fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionAction {
    Launch,
    Restart,
    Reuse,
}

impl SessionAction {
    fn plan(current: Option<&SessionState>, restart_after: u32) -> Self {
        match current {
            None => Self::Launch,
            Some(state) if state.is_expired(restart_after) => Self::Restart,
            Some(_) => Self::Reuse,
        }
    }
}

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    state: SessionState,
}

impl BrowserSession {
    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser wait failed: {}", e);
        }
        self.handler.abort();
    }
}

/// Browser fetch strategy
pub struct BrowserFetcher {
    settings: FetchSettings,
    timeout: Duration,
    session: Mutex<Option<BrowserSession>>,
    launches: AtomicU64,
}

impl BrowserFetcher {
    /// Creates the fetcher; Chromium itself is launched on first use
    pub fn new(settings: &FetchSettings, timeout: Duration) -> Self {
        Self {
            settings: settings.clone(),
            timeout,
            session: Mutex::new(None),
            launches: AtomicU64::new(0),
        }
    }

    /// How many browser processes have been started
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    async fn launch(&self) -> Result<BrowserSession, FetchError> {
        let mut builder = BrowserConfig::builder().request_timeout(self.timeout);
        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(FetchError::Client)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Client(format!("could not launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let generation = self.launches.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Launched headless browser (generation {})", generation);

        Ok(BrowserSession {
            browser,
            handler,
            state: SessionState::default(),
        })
    }

    /// Renders `url` and returns the final document HTML
    ///
    /// Calls are serialized; a restart that falls due is applied before the
    /// next fetch, never under one that is in flight.
    pub async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut guard = self.session.lock().await;

        let restart_after = self.settings.browser_restart_after;
        match SessionAction::plan(guard.as_ref().map(|s| &s.state), restart_after) {
            SessionAction::Reuse => {}
            SessionAction::Launch => *guard = Some(self.launch().await?),
            SessionAction::Restart => {
                if let Some(old) = guard.take() {
                    info!("Restarting browser after {} fetches", restart_after);
                    old.shutdown().await;
                }
                *guard = Some(self.launch().await?);
            }
        }
        let Some(session) = guard.as_mut() else {
            return Err(FetchError::Client("browser session unavailable".to_string()));
        };
        session.state.record_fetch();

        let page = session
            .browser
            .new_page(url)
            .await
            .map_err(|e| browser_error(url, e))?;

        let rendered = self.render(&page, url, &mut session.state).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close tab for {}: {}", url, e);
        }

        rendered
    }

    async fn render(
        &self,
        page: &Page,
        url: &str,
        state: &mut SessionState,
    ) -> Result<Vec<u8>, FetchError> {
        page.wait_for_navigation()
            .await
            .map_err(|e| browser_error(url, e))?;

        self.dismiss_cookie_consent(page, state).await;
        self.scroll_until_stable(page, url).await?;

        let html = page.content().await.map_err(|e| browser_error(url, e))?;
        Ok(html.into_bytes())
    }

    /// Best effort: clicks the first consent button found, once per process
    async fn dismiss_cookie_consent(&self, page: &Page, state: &mut SessionState) {
        if state.consent_dismissed {
            return;
        }

        for selector in &self.settings.cookie_consent_selectors {
            if let Ok(button) = page.find_element(selector.as_str()).await {
                if button.click().await.is_ok() {
                    debug!("Dismissed cookie consent via {}", selector);
                    state.consent_dismissed = true;
                    return;
                }
            }
        }
    }

    /// Scrolls and presses "load more" until the page height stops growing
    async fn scroll_until_stable(&self, page: &Page, url: &str) -> Result<(), FetchError> {
        let mut last_height = page_height(page, url).await?;

        for _ in 0..self.settings.max_scrolls {
            page.evaluate(SCROLL_TO_BOTTOM)
                .await
                .map_err(|e| browser_error(url, e))?;

            for selector in &self.settings.load_more_selectors {
                if let Ok(button) = page.find_element(selector.as_str()).await {
                    if button.click().await.is_ok() {
                        debug!("Clicked load-more {} on {}", selector, url);
                    }
                }
            }

            tokio::time::sleep(self.settings.scroll_pause()).await;

            let height = page_height(page, url).await?;
            if height == last_height {
                return Ok(());
            }
            last_height = height;
        }

        warn!(
            "{} still growing after {} scrolls; keeping what is loaded",
            url, self.settings.max_scrolls
        );
        Ok(())
    }

    /// Closes the browser process if one is running
    pub async fn shutdown(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.shutdown().await;
        }
    }
}

async fn page_height(page: &Page, url: &str) -> Result<f64, FetchError> {
    page.evaluate(PAGE_HEIGHT)
        .await
        .map_err(|e| browser_error(url, e))?
        .into_value::<f64>()
        .map_err(|e| browser_error(url, e))
}

fn browser_error(url: &str, error: impl std::fmt::Display) -> FetchError {
    FetchError::Browser {
        url: url.to_string(),
        reason: error.to_string(),
    }
}
