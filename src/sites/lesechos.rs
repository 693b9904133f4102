//! Les Échos: monthly archive pages, paginated

use crate::adapter::html::{
    first_attr, first_text, first_url_token, last_attr, last_text, resolve_link, select_all,
};
use crate::adapter::{Pagination, PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.lesechos.fr/";

struct LesEchos;

impl SiteRules for LesEchos {
    fn permalink(&self, section: ElementRef<'_>) -> Option<String> {
        resolve_link(&first_attr(section, "a", "href")?, BASE)
    }

    fn record(
        &self,
        section: ElementRef<'_>,
        _detail: Option<ElementRef<'_>>,
        _permalink: &str,
    ) -> PartialRecord {
        // The summary sits in the last div of the entry's second link.
        let content = select_all(section, "a")
            .get(1)
            .and_then(|link| last_text(*link, "div"));

        PartialRecord {
            title: first_text(section, "h3"),
            content,
            tag: None,
            image_url: last_attr(section, "a picture source", "srcset")
                .and_then(|srcset| first_url_token(&srcset))
                .and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "lesechos",
        "https://www.lesechos.fr/{date}{page}",
        DateFormat::Pattern("%Y/%m"),
        ymd(1991, 1, 1),
        "div > article",
    )
    .with_pagination(Pagination::new("section ul > li > a", "?page={}"));

    ArchiveSite::boxed(profile, LesEchos)
}
