//! L'Orient-Le Jour: full text for subscribers' articles, teaser otherwise

use crate::adapter::html::{first_attr, first_text, joined_text, last_text, resolve_link, select_first};
use crate::adapter::{PartialRecord, SiteAdapter};
use crate::sites::{ymd, ArchiveSite, DateFormat, SiteProfile, SiteRules};
use crate::HarvestError;
use scraper::ElementRef;

const BASE: &str = "https://www.lorientlejour.com/";

struct LOrientLeJour;

impl SiteRules for LOrientLeJour {
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
        let content = joined_text(page, "div.article_full_text", "\n")
            .or_else(|| first_text(page, "div.article_truncated_text"));

        PartialRecord {
            title: first_text(page, "h1"),
            content,
            tag: select_first(page, "h3").and_then(|heading| last_text(heading, "a")),
            image_url: first_attr(page, "div.image-container img", "src")
                .and_then(|src| resolve_link(&src, BASE)),
        }
    }
}

pub(super) fn build() -> Result<Box<dyn SiteAdapter>, HarvestError> {
    let profile = SiteProfile::new(
        "lorientlejour",
        "https://www.lorientlejour.com/seo.php?date={date}",
        DateFormat::Pattern("%Y-%m-%d"),
        ymd(1997, 1, 1),
        "div.articles > ul > li",
    );

    ArchiveSite::boxed(profile, LOrientLeJour)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_text_fallback() {
        let site = build().unwrap();
        let listing = r#"<div class="articles"><ul><li><a href="/article/1234-beyrouth">Beyrouth</a></li></ul></div>"#;
        let detail = r#"<html><body><h1>Beyrouth</h1>
            <h3><a>Liban</a><a>Politique</a></h3>
            <div class="article_truncated_text">Début de l'article</div>
        </body></html>"#;

        let sections = site.extract_sections(listing);
        let permalink = site.extract_permalink(&sections[0]).unwrap();
        assert_eq!(permalink, "https://www.lorientlejour.com/article/1234-beyrouth");

        let record = site.extract_record(&sections[0], Some(detail), &permalink);
        assert_eq!(record.content.as_deref(), Some("Début de l'article"));
        assert_eq!(record.tag.as_deref(), Some("Politique"));
        assert_eq!(record.image_url, None);
    }
}
