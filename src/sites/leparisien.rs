//! Le Parisien: protocol-relative links, tag taken from the URL

use crate::adapter::html::{first_attr, first_text, path_segment_from_end, resolve_link};
use crate::adapter::{PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.leparisien.fr/";

struct LeParisien;

impl SiteRules for LeParisien {
    fn needs_detail_page(&self) -> bool {
        true
    }

    // Entries are the anchors themselves.
    fn permalink(&self, section: ElementRef<'_>) -> Option<String> {
        resolve_link(&first_attr(section, "a", "href")?, BASE)
    }

    fn record(
        &self,
        _section: ElementRef<'_>,
        detail: Option<ElementRef<'_>>,
        permalink: &str,
    ) -> PartialRecord {
        let Some(page) = detail else {
            return PartialRecord::default();
        };
        PartialRecord {
            title: first_text(page, "h1"),
            content: first_text(page, "p"),
            tag: path_segment_from_end(permalink, 2),
            image_url: first_attr(page, "section img", "src").and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "leparisien",
        "https://www.leparisien.fr/archives/{date}",
        DateFormat::Pattern("%Y/%d-%m-%Y"),
        ymd(2009, 4, 1),
        "#top div > div > a",
    );

    ArchiveSite::boxed(profile, LeParisien)
}
