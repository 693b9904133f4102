//! L'Humanité: date-range search, paginated with a query parameter

use crate::adapter::html::{first_attr, first_text, joined_text, resolve_link, select_first};
use crate::adapter::{Pagination, PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.humanite.fr/";

struct LHumanite;

impl SiteRules for LHumanite {
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
            content: select_first(page, "article div").and_then(|body| joined_text(body, "p", "\n")),
            tag: first_text(page, "article a.rubric"),
            image_url: first_attr(page, "figure img", "src").and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "lhumanite",
        "https://www.humanite.fr/?s=&start_date={date}&end_date={date}{page}",
        DateFormat::Pattern("%Y-%m-%d"),
        ymd(1998, 1, 1),
        "article a",
    )
    .with_pagination(Pagination::new("nav > div > div a", "&page={}"));

    ArchiveSite::boxed(profile, LHumanite)
}
