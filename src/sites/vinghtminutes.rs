//! 20 Minutes: bulleted daily archive, fields on the article page

use crate::adapter::html::{first_attr, first_text, last_text, resolve_link};
use crate::adapter::{PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.20minutes.fr/";

struct VinghtMinutes;

impl SiteRules for VinghtMinutes {
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
            content: last_text(page, "header > div > span"),
            tag: first_text(page, "header > div > span"),
            image_url: first_attr(page, "figure img", "src").and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "vinghtminutes",
        "https://www.20minutes.fr/archives/{date}",
        DateFormat::Pattern("%Y/%m-%d"),
        ymd(2006, 1, 1),
        "article > div > div > div > div.grid > div.c-bulleted-list__item",
    );

    ArchiveSite::boxed(profile, VinghtMinutes)
}
