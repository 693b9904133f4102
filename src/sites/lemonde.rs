//! Le Monde: daily river pages, paginated, every field on the listing

use crate::adapter::html::{first_attr, first_text, first_url_token, resolve_link};
use crate::adapter::{Pagination, PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.lemonde.fr/";

struct LeMonde;

impl SiteRules for LeMonde {
    fn permalink(&self, section: ElementRef<'_>) -> Option<String> {
        resolve_link(&first_attr(section, "a", "href")?, BASE)
    }

    fn record(
        &self,
        section: ElementRef<'_>,
        _detail: Option<ElementRef<'_>>,
        _permalink: &str,
    ) -> PartialRecord {
        PartialRecord {
            title: first_text(section, "h3"),
            content: first_text(section, "p"),
            tag: first_text(section, "span a"),
            image_url: first_attr(section, "figure picture source", "data-srcset")
                .and_then(|srcset| first_url_token(&srcset))
                .and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "lemonde",
        "https://www.lemonde.fr/archives-du-monde/{date}/{page}",
        DateFormat::Pattern("%d-%m-%Y"),
        ymd(1944, 12, 19),
        "section#river > section.teaser",
    )
    .with_pagination(Pagination::new("section.river__pagination > a", "{}/"));

    ArchiveSite::boxed(profile, LeMonde)
}
