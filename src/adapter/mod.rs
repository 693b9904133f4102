//! Site adapters
//!
//! A [`SiteAdapter`] knows one archive: how its per-date listing URL is
//! built, how listed articles are cut out of a listing page, and how the
//! fields of a record are pulled from a listing entry or its article page.
//! Cross-cutting behaviors (pagination, dedup) wrap an adapter and expose the
//! same trait, see [`PaginationExpansion`] and [`DedupFilter`].

mod dedup;
pub mod html;
mod pagination;
mod registry;
#[cfg(test)]
pub(crate) mod testing;

pub use dedup::DedupFilter;
pub use pagination::PaginationExpansion;
pub use registry::{AdapterConstructor, AdapterContext, Registry};

use crate::fetch::{select_strategy, FetchError, PageFetcher, StrategyKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::Html;
use std::fmt;

/// Placeholder for the formatted date in a listing template
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Placeholder for the page suffix in a listing template
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Identifier of a news archive, e.g. `lemonde`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveId(String);

impl ArchiveId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which kinds of page only render their content with JavaScript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dynamicity {
    pub listing: bool,
    pub detail: bool,
}

impl Dynamicity {
    pub const STATIC: Dynamicity = Dynamicity {
        listing: false,
        detail: false,
    };
}

/// How an archive paginates a day's listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// Elements whose text holds advertised page numbers
    pub page_link_selector: String,
    /// Suffix substituted for `{page}`, with `{}` standing for the page number
    pub page_url_suffix: String,
}

impl Pagination {
    pub fn new(page_link_selector: impl Into<String>, page_url_suffix: impl Into<String>) -> Self {
        Self {
            page_link_selector: page_link_selector.into(),
            page_url_suffix: page_url_suffix.into(),
        }
    }

    /// The URL suffix for page `page`
    pub fn suffix_for(&self, page: u32) -> String {
        self.page_url_suffix.replace("{}", &page.to_string())
    }
}

/// Replaces `{page}` in a listing URL; an empty suffix addresses page one
pub fn resolve_page(listing_url: &str, suffix: &str) -> String {
    listing_url.replace(PAGE_PLACEHOLDER, suffix)
}

/// One article entry cut out of a listing page
///
/// Holds the entry's outer HTML rather than a parsed node so it can cross
/// await points and worker boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    html: String,
}

impl Section {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parses the entry back into a fragment for selector queries
    pub fn fragment(&self) -> Html {
        Html::parse_fragment(&self.html)
    }
}

/// Record fields extracted by an adapter
///
/// Each field is independent: one that cannot be found is `None` and does not
/// prevent the others from being filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag: Option<String>,
    pub image_url: Option<String>,
}

/// A listing URL template with its matching patterns
///
/// The template carries `{date}` (possibly several times) and optionally
/// `{page}`. Matching follows the template prefix: the date becomes a
/// wildcard and the page suffix disappears.
#[derive(Debug, Clone)]
pub struct ListingTemplate {
    template: String,
    any_page: Regex,
    paged: Option<Regex>,
}

impl ListingTemplate {
    pub fn new(template: impl Into<String>, pagination: Option<&Pagination>) -> Result<Self, regex::Error> {
        let template = template.into();

        let unpaged = template.replace(PAGE_PLACEHOLDER, "");
        let any_page = Regex::new(&format!("^{}", date_pattern(&unpaged)))?;

        let paged = match pagination {
            Some(pagination) if template.contains(PAGE_PLACEHOLDER) => {
                let suffix = pagination
                    .page_url_suffix
                    .split("{}")
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"(\d+)");
                let pattern = template
                    .split(PAGE_PLACEHOLDER)
                    .map(date_pattern)
                    .collect::<Vec<_>>()
                    .join(&suffix);
                Some(Regex::new(&format!("^{}", pattern))?)
            }
            _ => None,
        };

        Ok(Self {
            template,
            any_page,
            paged,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Fills in the date, leaving `{page}` for pagination to resolve
    pub fn format(&self, formatted_date: &str) -> String {
        self.template
            .replace(DATE_PLACEHOLDER, &transliterate(formatted_date))
    }

    /// Whether `url` is a listing page of this archive, any page
    pub fn matches(&self, url: &str) -> bool {
        self.any_page.is_match(url)
    }

    /// The page number of a resolved paginated listing URL
    pub fn page_number(&self, url: &str) -> Option<u32> {
        self.paged
            .as_ref()?
            .captures(url)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }
}

fn date_pattern(piece: &str) -> String {
    piece
        .split(DATE_PLACEHOLDER)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

/// Strips the French accents archives drop from their date slugs
pub fn transliterate(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' => 'e',
            'à' | 'â' => 'a',
            'ù' | 'û' => 'u',
            'î' => 'i',
            'ô' => 'o',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Per-archive scraping knowledge
///
/// The synchronous methods are pure functions of their inputs. The two async
/// methods own all network access an adapter performs and go through a
/// [`PageFetcher`], which picks static or browser fetching per URL.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn archive(&self) -> &ArchiveId;

    /// Earliest date the archive has listings for
    fn min_date(&self) -> NaiveDate;

    /// Listing URL for `date`, `{page}` still unresolved
    fn format_listing_url(&self, date: NaiveDate) -> String;

    /// Whether `url` is one of this archive's listing pages
    fn matches_url(&self, url: &str) -> bool;

    /// Page number when `url` is an already-resolved paginated listing page
    fn listing_page_number(&self, url: &str) -> Option<u32>;

    fn dynamicity(&self) -> Dynamicity;

    fn pagination(&self) -> Option<&Pagination>;

    /// Cuts the article entries out of a listing page, in document order
    fn extract_sections(&self, listing_html: &str) -> Vec<Section>;

    /// Absolute article URL of an entry, `None` to skip the entry
    fn extract_permalink(&self, section: &Section) -> Option<String>;

    /// Whether records need the article page fetched
    fn needs_detail_page(&self) -> bool {
        false
    }

    /// Builds record fields from the entry and, when fetched, the article page
    fn extract_record(
        &self,
        section: &Section,
        detail_html: Option<&str>,
        permalink: &str,
    ) -> PartialRecord;

    fn strategy_for(&self, url: &str) -> StrategyKind {
        select_strategy(
            self.dynamicity(),
            self.matches_url(url),
            self.listing_page_number(url).is_some(),
            url,
        )
    }

    /// Fetches page one of a listing and extracts its sections
    async fn fetch_sections(
        &self,
        fetcher: &dyn PageFetcher,
        listing_url: &str,
    ) -> Result<Vec<Section>, FetchError> {
        let url = resolve_page(listing_url, "");
        let body = fetcher.get(self.strategy_for(&url), &url).await?;
        Ok(self.extract_sections(&String::from_utf8_lossy(&body)))
    }

    /// Extracts a record, fetching the article page first when required
    async fn fetch_record(
        &self,
        fetcher: &dyn PageFetcher,
        section: &Section,
        permalink: &str,
    ) -> Result<PartialRecord, FetchError> {
        let detail = if self.needs_detail_page() {
            let body = fetcher.get(self.strategy_for(permalink), permalink).await?;
            Some(String::from_utf8_lossy(&body).into_owned())
        } else {
            None
        };
        Ok(self.extract_record(section, detail.as_deref(), permalink))
    }
}
