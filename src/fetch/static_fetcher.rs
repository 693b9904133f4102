//! Static HTTP fetching
//!
//! This module handles plain HTTP requests, including:
//! - Building HTTP clients that present themselves like a desktop browser
//! - Keeping cookies across requests within a session
//! - Recycling the session after a fixed lifetime
//! - Error classification

use crate::config::FetchSettings;
use crate::fetch::FetchError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Headers sent with every static request besides the user agent
///
/// Accept-Encoding is left to reqwest so responses are decompressed.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.5"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "max-age=0"),
];

/// Builds an HTTP client with browser-like headers and a cookie jar
///
/// # Example
///
/// ```no_run
/// use news_harvest::config::FetchSettings;
/// use news_harvest::fetch::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&FetchSettings::default(), Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    settings: &FetchSettings,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    for &(name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

struct Session {
    client: Client,
    started_at: Instant,
    generation: u64,
}

/// Static fetch strategy
///
/// One session (client plus cookie jar) is shared by every worker and
/// replaced once it is older than the configured lifetime.
pub struct StaticFetcher {
    settings: FetchSettings,
    timeout: Duration,
    lifetime: Duration,
    session: Mutex<Session>,
}

impl StaticFetcher {
    pub fn new(settings: &FetchSettings, timeout: Duration) -> Result<Self, FetchError> {
        let client = build_http_client(settings, timeout)
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            settings: settings.clone(),
            timeout,
            lifetime: settings.session_lifetime(),
            session: Mutex::new(Session {
                client,
                started_at: Instant::now(),
                generation: 1,
            }),
        })
    }

    /// Overrides the session lifetime
    pub fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Number of sessions created so far
    pub fn generation(&self) -> u64 {
        self.session
            .lock()
            .map(|session| session.generation)
            .unwrap_or_else(|poisoned| poisoned.into_inner().generation)
    }

    /// The current client, rebuilding the session first if it has expired
    fn client(&self) -> Result<Client, FetchError> {
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if session.started_at.elapsed() >= self.lifetime {
            session.client = build_http_client(&self.settings, self.timeout)
                .map_err(|e| FetchError::Client(e.to_string()))?;
            session.started_at = Instant::now();
            session.generation += 1;
            info!("Recycled HTTP session (generation {})", session.generation);
        }

        Ok(session.client.clone())
    }

    /// Fetches a URL, failing on any non-success status
    pub async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let client = self.client()?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body.to_vec())
    }
}

fn classify(url: &str, error: reqwest::Error) -> FetchError {
    let reason = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    FetchError::Network {
        url: url.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new(&FetchSettings::default(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetchSettings::default(), Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_session_is_recycled_after_lifetime() {
        let fetcher = fetcher().with_session_lifetime(Duration::ZERO);
        assert_eq!(fetcher.generation(), 1);

        fetcher.client().unwrap();
        fetcher.client().unwrap();
        assert_eq!(fetcher.generation(), 3);
    }

    #[test]
    fn test_session_is_kept_within_lifetime() {
        let fetcher = fetcher();
        fetcher.client().unwrap();
        fetcher.client().unwrap();
        assert_eq!(fetcher.generation(), 1);
    }

    #[tokio::test]
    async fn test_get_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("sec-fetch-dest", "document"))
            .and(header("sec-fetch-mode", "navigate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .get(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"<html>ok</html>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = fetcher().get(&format!("{}/missing", server.uri())).await;
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Nothing listens on port 1.
        let result = fetcher().get("http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(FetchError::Network { .. })));
    }
}
