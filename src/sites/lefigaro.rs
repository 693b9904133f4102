//! Le Figaro: search-results listing rendered client-side

use crate::adapter::html::{first_attr, first_text, last_text, resolve_link, srcset_url};
use crate::adapter::{Dynamicity, PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.lefigaro.fr/";

struct LeFigaro;

impl SiteRules for LeFigaro {
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
            title: first_text(section, "h2"),
            content: last_text(section, "div"),
            tag: last_text(section, "ul li"),
            image_url: first_attr(section, "img", "srcset")
                .and_then(|srcset| srcset_url(&srcset))
                .and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "lefigaro",
        "https://recherche.lefigaro.fr/recherche/_/?datemin={date}&datemax={date}",
        DateFormat::Pattern("%d-%m-%Y"),
        ymd(2005, 1, 1),
        "#articles-list > article",
    )
    .with_dynamicity(Dynamicity {
        listing: true,
        detail: false,
    });

    ArchiveSite::boxed(profile, LeFigaro)
}
