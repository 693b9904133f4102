//! Ouest-France: French month names in the date slug, paginated

use crate::adapter::html::{first_attr, first_text, path_segment_from_end, resolve_link, srcset_url};
use crate::adapter::{Pagination, PartialRecord, SiteAdapter};
use crate::sites::{french_month, ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use chrono::{Datelike, NaiveDate};
use scraper::ElementRef;

const BASE: &str = "https://www.ouest-france.fr/";

struct OuestFrance;

impl SiteRules for OuestFrance {
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
        permalink: &str,
    ) -> PartialRecord {
        let Some(page) = detail else {
            return PartialRecord::default();
        };
        PartialRecord {
            title: first_text(page, "article header h1"),
            content: first_text(page, "article header p"),
            // Articles live under /<region>/<city>/<slug>.
            tag: path_segment_from_end(permalink, 2),
            image_url: first_attr(page, "article header figure img", "srcset")
                .and_then(|srcset| srcset_url(&srcset))
                .and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

/// `2012/01-février-2012`; accents are stripped by the listing template
fn listing_date(date: NaiveDate) -> String {
    format!(
        "{}/{:02}-{}-{}",
        date.year(),
        date.day(),
        french_month(date),
        date.year()
    )
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "ouestfrance",
        "https://www.ouest-france.fr/archives/{date}/{page}",
        DateFormat::Custom(listing_date),
        ymd(2012, 1, 1),
        "article > div",
    )
    .with_pagination(Pagination::new("nav > ul > li", "?page={}"));

    ArchiveSite::boxed(profile, OuestFrance)
}
