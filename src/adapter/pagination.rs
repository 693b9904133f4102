//! Pagination expansion
//!
//! Turns a paginated archive's listing into the concatenation of all its
//! pages. Page one is fetched as usual; the highest page number it
//! advertises decides how many more pages are fetched in order. A failing
//! page ends the expansion and keeps everything gathered so far.

use crate::adapter::{
    resolve_page, ArchiveId, Dynamicity, Pagination, PartialRecord, Section, SiteAdapter,
};
use crate::fetch::{FetchError, PageFetcher, StrategyKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Wraps an adapter so `fetch_sections` walks every listing page
pub struct PaginationExpansion {
    inner: Box<dyn SiteAdapter>,
}

impl PaginationExpansion {
    pub fn new(inner: Box<dyn SiteAdapter>) -> Self {
        Self { inner }
    }
}

/// Highest numeric text among the pagination widget's elements, 1 if none
pub fn max_advertised_page(listing_html: &str, page_link_selector: &str) -> u32 {
    let Ok(selector) = Selector::parse(page_link_selector) else {
        return 1;
    };
    let document = Html::parse_document(listing_html);
    let max_page = document
        .select(&selector)
        .filter_map(|element| {
            element
                .text()
                .collect::<String>()
                .trim()
                .parse::<u32>()
                .ok()
        })
        .max()
        .unwrap_or(1);
    max_page.max(1)
}

#[async_trait]
impl SiteAdapter for PaginationExpansion {
    fn archive(&self) -> &ArchiveId {
        self.inner.archive()
    }

    fn min_date(&self) -> NaiveDate {
        self.inner.min_date()
    }

    fn format_listing_url(&self, date: NaiveDate) -> String {
        self.inner.format_listing_url(date)
    }

    fn matches_url(&self, url: &str) -> bool {
        self.inner.matches_url(url)
    }

    fn listing_page_number(&self, url: &str) -> Option<u32> {
        self.inner.listing_page_number(url)
    }

    fn dynamicity(&self) -> Dynamicity {
        self.inner.dynamicity()
    }

    fn pagination(&self) -> Option<&Pagination> {
        self.inner.pagination()
    }

    fn extract_sections(&self, listing_html: &str) -> Vec<Section> {
        self.inner.extract_sections(listing_html)
    }

    fn extract_permalink(&self, section: &Section) -> Option<String> {
        self.inner.extract_permalink(section)
    }

    fn needs_detail_page(&self) -> bool {
        self.inner.needs_detail_page()
    }

    fn extract_record(
        &self,
        section: &Section,
        detail_html: Option<&str>,
        permalink: &str,
    ) -> PartialRecord {
        self.inner.extract_record(section, detail_html, permalink)
    }

    fn strategy_for(&self, url: &str) -> StrategyKind {
        self.inner.strategy_for(url)
    }

    async fn fetch_sections(
        &self,
        fetcher: &dyn PageFetcher,
        listing_url: &str,
    ) -> Result<Vec<Section>, FetchError> {
        let Some(pagination) = self.inner.pagination() else {
            return self.inner.fetch_sections(fetcher, listing_url).await;
        };

        let first_url = resolve_page(listing_url, "");
        let body = fetcher.get(self.strategy_for(&first_url), &first_url).await?;
        let (mut sections, max_page) = {
            let html = String::from_utf8_lossy(&body);
            (
                self.inner.extract_sections(&html),
                max_advertised_page(&html, &pagination.page_link_selector),
            )
        };
        debug!("{} advertises {} page(s)", first_url, max_page);

        for page in 2..=max_page {
            let url = resolve_page(listing_url, &pagination.suffix_for(page));
            match fetcher.get(self.strategy_for(&url), &url).await {
                Ok(body) => {
                    sections.extend(self.inner.extract_sections(&String::from_utf8_lossy(&body)));
                }
                Err(e) => {
                    warn!(
                        "Stopping pagination of {} at page {} of {}: {}",
                        first_url, page, max_page, e
                    );
                    break;
                }
            }
        }

        Ok(sections)
    }

    async fn fetch_record(
        &self,
        fetcher: &dyn PageFetcher,
        section: &Section,
        permalink: &str,
    ) -> Result<PartialRecord, FetchError> {
        self.inner.fetch_record(fetcher, section, permalink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::{listing_html, stub_site, StubFetcher, STUB_BASE};

    fn paginated() -> PaginationExpansion {
        PaginationExpansion::new(stub_site(STUB_BASE, true, false))
    }

    #[test]
    fn test_max_advertised_page() {
        let html = r#"<nav class="pages"><a>1</a><a>2</a><a>7</a><a>Suivant</a></nav>"#;
        assert_eq!(max_advertised_page(html, "nav.pages a"), 7);
        assert_eq!(max_advertised_page("<p>no widget</p>", "nav.pages a"), 1);
        assert_eq!(max_advertised_page(html, "nav[["), 1);
        assert_eq!(max_advertised_page(r#"<nav class="pages"><a>0</a></nav>"#, "nav.pages a"), 1);
    }

    #[tokio::test]
    async fn test_all_pages_are_concatenated_in_order() {
        let listing = format!("{}/archive/2020-01-01/{{page}}", STUB_BASE);
        let fetcher = StubFetcher::new()
            .page(&format!("{}/archive/2020-01-01/", STUB_BASE), &listing_html(&["a1", "a2"], 3))
            .page(&format!("{}/archive/2020-01-01/2/", STUB_BASE), &listing_html(&["b1"], 3))
            .page(&format!("{}/archive/2020-01-01/3/", STUB_BASE), &listing_html(&["c1"], 3));

        let adapter = paginated();
        let sections = adapter.fetch_sections(&fetcher, &listing).await.unwrap();

        let permalinks: Vec<String> = sections
            .iter()
            .filter_map(|s| adapter.extract_permalink(s))
            .collect();
        assert_eq!(
            permalinks,
            vec![
                format!("{}/article/a1", STUB_BASE),
                format!("{}/article/a2", STUB_BASE),
                format!("{}/article/b1", STUB_BASE),
                format!("{}/article/c1", STUB_BASE),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_page_truncates() {
        let listing = format!("{}/archive/2020-01-01/{{page}}", STUB_BASE);
        let fetcher = StubFetcher::new()
            .page(&format!("{}/archive/2020-01-01/", STUB_BASE), &listing_html(&["a1"], 5))
            .page(&format!("{}/archive/2020-01-01/2/", STUB_BASE), &listing_html(&["b1"], 5))
            .failing(&format!("{}/archive/2020-01-01/3/", STUB_BASE), 500)
            .page(&format!("{}/archive/2020-01-01/4/", STUB_BASE), &listing_html(&["d1"], 5));

        let sections = paginated().fetch_sections(&fetcher, &listing).await.unwrap();

        assert_eq!(sections.len(), 2);
        assert!(!fetcher
            .requested()
            .contains(&format!("{}/archive/2020-01-01/4/", STUB_BASE)));
    }

    #[tokio::test]
    async fn test_failing_first_page_is_an_error() {
        let listing = format!("{}/archive/2020-01-01/{{page}}", STUB_BASE);
        let fetcher = StubFetcher::new().failing(&format!("{}/archive/2020-01-01/", STUB_BASE), 503);

        let result = paginated().fetch_sections(&fetcher, &listing).await;
        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_unpaginated_adapter_passes_through() {
        let wrapped = PaginationExpansion::new(stub_site(STUB_BASE, false, false));
        let listing = format!("{}/archive/2020-01-01/{{page}}", STUB_BASE);
        let fetcher = StubFetcher::new()
            .page(&format!("{}/archive/2020-01-01/", STUB_BASE), &listing_html(&["a1"], 9));

        let sections = wrapped.fetch_sections(&fetcher, &listing).await.unwrap();

        assert_eq!(sections.len(), 1);
        assert_eq!(fetcher.requested().len(), 1);
    }
}
