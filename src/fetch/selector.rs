//! Strategy selection

use crate::adapter::Dynamicity;
use crate::fetch::StrategyKind;

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".tiff",
];

/// Whether a URL ends with an image extension, ignoring case
pub fn is_image_url(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

/// Picks the fetch strategy for a URL
///
/// | URL | Strategy |
/// |-----|----------|
/// | image | Static |
/// | listing page, listing dynamic, not a resolved page >= 2 | Browser |
/// | any other page, detail dynamic | Browser |
/// | everything else | Static |
///
/// Resolved pagination pages are addressed by URL, so they never need the
/// scrolling browser even on archives whose first page does.
pub fn select_strategy(
    dynamicity: Dynamicity,
    is_listing: bool,
    is_resolved_page: bool,
    url: &str,
) -> StrategyKind {
    if is_image_url(url) {
        return StrategyKind::Static;
    }

    let dynamic = if is_listing {
        dynamicity.listing && !is_resolved_page
    } else {
        dynamicity.detail
    };

    if dynamic {
        StrategyKind::Browser
    } else {
        StrategyKind::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_ONLY: Dynamicity = Dynamicity {
        listing: true,
        detail: false,
    };
    const DETAIL_ONLY: Dynamicity = Dynamicity {
        listing: false,
        detail: true,
    };

    #[test]
    fn test_is_image_url() {
        assert!(is_image_url("https://cdn.example.com/a/b.JPG"));
        assert!(is_image_url("https://cdn.example.com/a/b.webp"));
        assert!(!is_image_url("https://cdn.example.com/a/b.jpg?w=300"));
        assert!(!is_image_url("https://example.com/article.html"));
    }

    #[test]
    fn test_images_are_always_static() {
        let all = Dynamicity {
            listing: true,
            detail: true,
        };
        assert_eq!(
            select_strategy(all, false, false, "https://x/y.png"),
            StrategyKind::Static
        );
        assert_eq!(
            select_strategy(all, true, false, "https://x/y.png"),
            StrategyKind::Static
        );
    }

    #[test]
    fn test_dynamic_listing() {
        assert_eq!(
            select_strategy(LISTING_ONLY, true, false, "https://x/2020/"),
            StrategyKind::Browser
        );
        assert_eq!(
            select_strategy(LISTING_ONLY, true, true, "https://x/2020/?page=2"),
            StrategyKind::Static
        );
        assert_eq!(
            select_strategy(LISTING_ONLY, false, false, "https://x/article"),
            StrategyKind::Static
        );
    }

    #[test]
    fn test_dynamic_detail() {
        assert_eq!(
            select_strategy(DETAIL_ONLY, false, false, "https://x/article"),
            StrategyKind::Browser
        );
        assert_eq!(
            select_strategy(DETAIL_ONLY, true, false, "https://x/2020/"),
            StrategyKind::Static
        );
    }

    #[test]
    fn test_static_archive() {
        for (is_listing, is_page) in [(true, false), (true, true), (false, false)] {
            assert_eq!(
                select_strategy(Dynamicity::STATIC, is_listing, is_page, "https://x/a"),
                StrategyKind::Static
            );
        }
    }
}
