//! Mediapart: front-page archive, image on the listing, text on the article

use crate::adapter::html::{first_attr, first_text, nth_text, resolve_link};
use crate::adapter::{PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.mediapart.fr/";

struct Mediapart;

impl SiteRules for Mediapart {
    fn needs_detail_page(&self) -> bool {
        true
    }

    fn permalink(&self, section: ElementRef<'_>) -> Option<String> {
        resolve_link(&first_attr(section, "a", "href")?, BASE)
    }

    fn record(
        &self,
        section: ElementRef<'_>,
        detail: Option<ElementRef<'_>>,
        _permalink: &str,
    ) -> PartialRecord {
        let image_url = first_attr(section, "img", "src").and_then(|src| resolve_link(&src, BASE));
        let Some(page) = detail else {
            return PartialRecord {
                image_url,
                ..PartialRecord::default()
            };
        };
        PartialRecord {
            title: first_text(page, "h1"),
            content: nth_text(page, "main p", 1),
            tag: nth_text(page, "main p", 0),
            image_url,
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "mediapart",
        "https://www.mediapart.fr/journal/une/{date}",
        DateFormat::Pattern("%d%m%y"),
        ymd(2009, 1, 1),
        "h3",
    );

    ArchiveSite::boxed(profile, Mediapart)
}
