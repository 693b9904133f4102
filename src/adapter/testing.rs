//! Test doubles shared by the adapter and crawler unit tests

use crate::adapter::html::{first_attr, first_text, resolve_link};
use crate::adapter::{Pagination, PartialRecord, SiteAdapter};
use crate::fetch::{FetchError, PageFetcher, StrategyKind};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use async_trait::async_trait;
use scraper::ElementRef;
use std::collections::HashMap;
use std::sync::Mutex;

pub const STUB_BASE: &str = "https://stub.example";

/// Serves canned pages; unknown URLs are 404s
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, Result<String, u16>>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn failing(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Err(status));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn get(&self, _kind: StrategyKind, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone().into_bytes()),
            Some(Err(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// A listing page with one entry per slug and a page widget up to `pages`
pub fn listing_html(slugs: &[&str], pages: u32) -> String {
    let entries: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li><a href="/article/{slug}">{slug}</a><h3>Title {slug}</h3><p>Summary {slug}</p></li>"#
            )
        })
        .collect();
    let widget: String = (1..=pages).map(|n| format!("<a>{}</a>", n)).collect();
    format!(
        r#"<html><body><ul class="river">{}</ul><nav class="pages">{}</nav></body></html>"#,
        entries, widget
    )
}

struct StubRules {
    base: String,
    detail: bool,
}

impl SiteRules for StubRules {
    fn needs_detail_page(&self) -> bool {
        self.detail
    }

    fn permalink(&self, section: ElementRef<'_>) -> Option<String> {
        resolve_link(&first_attr(section, "a", "href")?, &self.base)
    }

    fn record(
        &self,
        section: ElementRef<'_>,
        detail: Option<ElementRef<'_>>,
        _permalink: &str,
    ) -> PartialRecord {
        let scope = detail.unwrap_or(section);
        PartialRecord {
            title: first_text(scope, "h1").or_else(|| first_text(scope, "h3")),
            content: first_text(scope, "p"),
            tag: first_text(scope, ".tag"),
            image_url: first_attr(scope, "img", "src"),
        }
    }
}

/// A `stubpress` adapter over `{base}/archive/{date}/{page}`
pub fn stub_site(base: &str, paginated: bool, detail: bool) -> Box<dyn SiteAdapter> {
    let mut profile = SiteProfile::new(
        "stubpress",
        format!("{}/archive/{{date}}/{{page}}", base),
        DateFormat::Pattern("%Y-%m-%d"),
        ymd(2000, 1, 1),
        "ul.river > li",
    );
    if paginated {
        profile = profile.with_pagination(Pagination::new("nav.pages a", "{}/"));
    }
    ArchiveSite::boxed(
        profile,
        StubRules {
            base: base.to_string(),
            detail,
        },
    )
    .unwrap()
}
