//! Built-in archives
//!
//! Every archive is an [`ArchiveSite`]: a declarative [`SiteProfile`]
//! (listing template, date format, earliest date, section selector,
//! pagination, dynamicity) plus a small [`SiteRules`] value holding the
//! archive's extraction selectors.

mod lefigaro;
mod lemonde;
mod leparisien;
mod lepoint;
mod lesechos;
mod lhumanite;
mod liberation;
mod lorientlejour;
mod mediapart;
mod ouestfrance;
mod vinghtminutes;

use crate::adapter::{
    ArchiveId, Dynamicity, ListingTemplate, Pagination, PartialRecord, Registry, Section,
    SiteAdapter,
};
use crate::{ConfigError, HarvestError};
use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Registers every built-in archive under its identifier
pub fn register_all(registry: &mut Registry) {
    registry.register("lemonde", lemonde::build);
    registry.register("lefigaro", lefigaro::build);
    registry.register("lesechos", lesechos::build);
    registry.register("vinghtminutes", vinghtminutes::build);
    registry.register("ouestfrance", ouestfrance::build);
    registry.register("liberation", liberation::build);
    registry.register("mediapart", mediapart::build);
    registry.register("leparisien", leparisien::build);
    registry.register("lhumanite", lhumanite::build);
    registry.register("lepoint", lepoint::build);
    registry.register("lorientlejour", lorientlejour::build);
}

/// A calendar date from literal parts
///
/// Only used with known-good literals; an impossible date degrades to the
/// earliest representable one rather than panicking.
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// French name of the month of `date`, accents included
pub fn french_month(date: NaiveDate) -> &'static str {
    FRENCH_MONTHS[date.month0() as usize]
}

/// How a date is rendered into the listing template
#[derive(Debug, Clone, Copy)]
pub enum DateFormat {
    /// A chrono `strftime` pattern
    Pattern(&'static str),
    /// Anything chrono patterns cannot express
    Custom(fn(NaiveDate) -> String),
}

impl DateFormat {
    pub fn render(&self, date: NaiveDate) -> String {
        match self {
            DateFormat::Pattern(pattern) => date.format(pattern).to_string(),
            DateFormat::Custom(render) => render(date),
        }
    }
}

/// Declarative description of an archive
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub archive: ArchiveId,
    pub listing_template: String,
    pub date_format: DateFormat,
    pub min_date: NaiveDate,
    pub section_selector: String,
    pub pagination: Option<Pagination>,
    pub dynamicity: Dynamicity,
}

impl SiteProfile {
    pub fn new(
        archive: &str,
        listing_template: impl Into<String>,
        date_format: DateFormat,
        min_date: NaiveDate,
        section_selector: &str,
    ) -> Self {
        Self {
            archive: ArchiveId::new(archive),
            listing_template: listing_template.into(),
            date_format,
            min_date,
            section_selector: section_selector.to_string(),
            pagination: None,
            dynamicity: Dynamicity::STATIC,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_dynamicity(mut self, dynamicity: Dynamicity) -> Self {
        self.dynamicity = dynamicity;
        self
    }
}

/// Extraction selectors of one archive
pub trait SiteRules: Send + Sync + 'static {
    /// Whether record fields live on the article page
    fn needs_detail_page(&self) -> bool {
        false
    }

    /// Absolute article URL of a listing entry
    fn permalink(&self, section: ElementRef<'_>) -> Option<String>;

    /// Record fields from the entry and, when fetched, the article page
    fn record(
        &self,
        section: ElementRef<'_>,
        detail: Option<ElementRef<'_>>,
        permalink: &str,
    ) -> PartialRecord;
}

/// A [`SiteAdapter`] built from a profile and rules
pub struct ArchiveSite<R> {
    profile: SiteProfile,
    template: ListingTemplate,
    rules: R,
}

impl<R: SiteRules> ArchiveSite<R> {
    pub fn new(profile: SiteProfile, rules: R) -> Result<Self, HarvestError> {
        if let Err(e) = Selector::parse(&profile.section_selector) {
            return Err(ConfigError::Validation(format!(
                "{}: invalid section selector '{}': {:?}",
                profile.archive, profile.section_selector, e
            ))
            .into());
        }
        let template = ListingTemplate::new(&profile.listing_template, profile.pagination.as_ref())?;
        Ok(Self {
            profile,
            template,
            rules,
        })
    }

    /// Builds the site as a boxed adapter, ready for registration
    pub fn boxed(profile: SiteProfile, rules: R) -> Result<Box<dyn SiteAdapter>, HarvestError> {
        Ok(Box::new(Self::new(profile, rules)?))
    }
}

impl<R: SiteRules> SiteAdapter for ArchiveSite<R> {
    fn archive(&self) -> &ArchiveId {
        &self.profile.archive
    }

    fn min_date(&self) -> NaiveDate {
        self.profile.min_date
    }

    fn format_listing_url(&self, date: NaiveDate) -> String {
        self.template.format(&self.profile.date_format.render(date))
    }

    fn matches_url(&self, url: &str) -> bool {
        self.template.matches(url)
    }

    fn listing_page_number(&self, url: &str) -> Option<u32> {
        self.template.page_number(url)
    }

    fn dynamicity(&self) -> Dynamicity {
        self.profile.dynamicity
    }

    fn pagination(&self) -> Option<&Pagination> {
        self.profile.pagination.as_ref()
    }

    fn extract_sections(&self, listing_html: &str) -> Vec<Section> {
        let Ok(selector) = Selector::parse(&self.profile.section_selector) else {
            warn!("{}: section selector no longer parses", self.profile.archive);
            return Vec::new();
        };
        let document = Html::parse_document(listing_html);
        let sections = document
            .select(&selector)
            .map(|element| Section::new(element.html()))
            .collect();
        sections
    }

    fn extract_permalink(&self, section: &Section) -> Option<String> {
        let fragment = section.fragment();
        self.rules.permalink(fragment.root_element())
    }

    fn needs_detail_page(&self) -> bool {
        self.rules.needs_detail_page()
    }

    fn extract_record(
        &self,
        section: &Section,
        detail_html: Option<&str>,
        permalink: &str,
    ) -> PartialRecord {
        let fragment = section.fragment();
        let detail = detail_html.map(Html::parse_document);
        self.rules.record(
            fragment.root_element(),
            detail.as_ref().map(Html::root_element),
            permalink,
        )
    }
}
