//! Le Point

use crate::adapter::html::{first_attr, first_text, resolve_link};
use crate::adapter::{PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.lepoint.fr/";

struct LePoint;

impl SiteRules for LePoint {
    fn needs_detail_page(&self) -> bool {
        true
    }

    fn permalink(&self, section: ElementRef<'_>) -> Option<String> {
        resolve_link(&first_attr(section, "a", "href")?, BASE)
    }

    fn record(
        &self,
        _section: ElementRef<'_>,
        detail: Option<ElementRef<'_>>,
        _permalink: &str,
    ) -> PartialRecord {
        let Some(page) = detail else {
            return PartialRecord::default();
        };
        PartialRecord {
            title: first_text(page, "h1"),
            content: first_text(page, "div#contenu"),
            tag: first_text(page, "main > ul > li"),
            image_url: first_attr(page, "figure img", "src").and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "lepoint",
        "https://www.lepoint.fr/archives/{date}.php",
        DateFormat::Pattern("%m-%Y/%d"),
        ymd(2010, 5, 1),
        "main > article",
    );

    ArchiveSite::boxed(profile, LePoint)
}
