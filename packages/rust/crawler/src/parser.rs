//! Assignment link extraction from portal pages.

use scraper::{Html, Selector};
use url::Url;

use themis_shared::{AssignmentLink, Result, ThemisError};

/// Compile a CSS selector, mapping failures to a config error.
pub fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| ThemisError::config(format!("invalid link selector '{raw}': {e}")))
}

/// Collect the assignment links matched by `selector`, in document order.
///
/// The name is the anchor text with whitespace collapsed; the URL is the
/// `href` resolved against `base_url` with its fragment removed. Anchors
/// without text, and `#`, `javascript:` and `mailto:` targets, are skipped.
pub fn extract_assignments(doc: &Html, selector: &Selector, base_url: &Url) -> Vec<AssignmentLink> {
    let mut links = Vec::new();

    for el in doc.select(selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }

        let name = el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            continue;
        }

        if let Ok(mut resolved) = base_url.join(href) {
            resolved.set_fragment(None);
            links.push(AssignmentLink::new(name, resolved.to_string()));
        }
    }

    links
}
