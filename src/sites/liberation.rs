//! Libération: article pages rendered client-side

use crate::adapter::html::{first_attr, first_text, resolve_link, select_all, text_of};
use crate::adapter::{Dynamicity, PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.liberation.fr/";

/// Paragraph spans this short are bylines and separators, not body text
const MIN_PARAGRAPH_LEN: usize = 6;

struct Liberation;

impl SiteRules for Liberation {
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

        let paragraphs: Vec<String> = select_all(page, "main > div > div > span")
            .into_iter()
            .map(text_of)
            .filter(|text| text.chars().count() >= MIN_PARAGRAPH_LEN)
            .collect();

        PartialRecord {
            title: first_text(page, "main h1"),
            content: (!paragraphs.is_empty()).then(|| paragraphs.join(" ")),
            tag: first_text(page, "main > div > div > div > div > span"),
            image_url: first_attr(page, "main figure img", "src").and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "liberation",
        "https://www.liberation.fr/archives/{date}",
        DateFormat::Pattern("%Y/%m/%d"),
        ymd(1998, 1, 1),
        "main article",
    )
    .with_dynamicity(Dynamicity {
        listing: false,
        detail: true,
    });

    ArchiveSite::boxed(profile, Liberation)
}
