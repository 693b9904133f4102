//! Selector helpers shared by the site adapters
//!
//! All helpers take an `ElementRef` scope and return owned, trimmed text.
//! Anything missing or empty comes back as `None`.

use scraper::{ElementRef, Selector};
use url::Url;

/// Collected, trimmed text of an element
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// All matches of `css` below `scope`; an invalid selector matches nothing
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    let matches = scope.select(&selector).collect();
    matches
}

pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let first = scope.select(&selector).next();
    first
}

pub fn first_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    select_first(scope, css).map(text_of).and_then(non_empty)
}

pub fn last_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    select_all(scope, css).pop().map(text_of).and_then(non_empty)
}

pub fn nth_text(scope: ElementRef<'_>, css: &str, n: usize) -> Option<String> {
    select_all(scope, css)
        .get(n)
        .copied()
        .map(text_of)
        .and_then(non_empty)
}

/// Non-empty texts of every match joined with `separator`
pub fn joined_text(scope: ElementRef<'_>, css: &str, separator: &str) -> Option<String> {
    let parts: Vec<String> = select_all(scope, css)
        .into_iter()
        .map(text_of)
        .filter(|text| !text.is_empty())
        .collect();
    non_empty(parts.join(separator))
}

pub fn first_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    select_first(scope, css)?
        .value()
        .attr(attr)
        .map(|value| value.trim().to_string())
        .and_then(non_empty)
}

pub fn last_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    select_all(scope, css)
        .pop()?
        .value()
        .attr(attr)
        .map(|value| value.trim().to_string())
        .and_then(non_empty)
}

/// Picks the last candidate URL out of a `srcset`
///
/// `"a.jpg 300w, b.jpg 600w"` yields `b.jpg`: the second-to-last whitespace
/// token, which is the URL of the widest candidate.
pub fn srcset_url(srcset: &str) -> Option<String> {
    let tokens: Vec<&str> = srcset.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    Some(tokens[tokens.len() - 2].trim_end_matches(',').to_string())
}

/// First whitespace token of an attribute that may be a bare URL or a srcset
pub fn first_url_token(value: &str) -> Option<String> {
    value
        .split_whitespace()
        .next()
        .map(|token| token.trim_end_matches(',').to_string())
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// The `n`-th path segment counted from the end of a URL, ignoring a
/// trailing slash (`n = 1` is the last segment)
pub fn path_segment_from_end(url: &str, n: usize) -> Option<String> {
    let path = Url::parse(url).ok()?.path().trim_end_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if n == 0 || n > segments.len() {
        return None;
    }
    non_empty(segments[segments.len() - n].to_string())
}
