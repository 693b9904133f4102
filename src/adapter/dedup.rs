//! Dedup filtering
//!
//! Drops listing entries whose permalink is already stored, so known
//! articles are never re-fetched or re-enriched. The set of stored links for
//! the archive and crawl window is loaded once, on first use.

use crate::adapter::{ArchiveId, Dynamicity, Pagination, PartialRecord, Section, SiteAdapter};
use crate::crawler::CrawlWindow;
use crate::fetch::{FetchError, PageFetcher, StrategyKind};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Wraps an adapter so known permalinks come back as `None`
pub struct DedupFilter {
    inner: Box<dyn SiteAdapter>,
    storage: Arc<dyn Storage>,
    window: CrawlWindow,
    done: OnceCell<HashSet<String>>,
}

impl DedupFilter {
    pub fn new(inner: Box<dyn SiteAdapter>, storage: Arc<dyn Storage>, window: CrawlWindow) -> Self {
        Self {
            inner,
            storage,
            window,
            done: OnceCell::new(),
        }
    }

    /// The stored links, loading them on first call
    ///
    /// A failed load is retried on the next call; until one succeeds nothing
    /// is filtered and storage idempotence absorbs the repeats.
    fn done_links(&self) -> Option<&HashSet<String>> {
        let loaded = self.done.get_or_try_init(|| {
            let links = self
                .storage
                .get_done_links(self.inner.archive(), &self.window)?;
            info!(
                "{}: {} articles already collected between {} and {}",
                self.inner.archive(),
                links.len(),
                self.window.begin,
                self.window.end
            );
            Ok::<_, crate::storage::StorageError>(links)
        });

        match loaded {
            Ok(links) => Some(links),
            Err(e) => {
                warn!("{}: could not load done links: {}", self.inner.archive(), e);
                None
            }
        }
    }
}

#[async_trait]
impl SiteAdapter for DedupFilter {
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
        let permalink = self.inner.extract_permalink(section)?;
        match self.done_links() {
            Some(done) if done.contains(&permalink) => {
                debug!("Skipping already collected {}", permalink);
                None
            }
            _ => Some(permalink),
        }
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
        self.inner.fetch_sections(fetcher, listing_url).await
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
