//! Platform adapters: per-platform extraction heuristics.
//!
//! Every adapter has the same shape: borrow a page from the shared
//! session (when the platform is rendered), navigate and wait, take a
//! source snapshot, close the page on every path, then run a pure
//! parser over the snapshot. The parsers try ordered, named recovery
//! strategies — first match wins — and the pure split keeps every
//! strategy testable against fixture markup without a browser.

pub mod euratech;
pub mod luma;
pub mod meetup;
pub mod mobilizon;

use scraper::ElementRef;

/// Visible text of an element as trimmed, non-empty lines.
///
/// A source snapshot carries no layout, so "lines" are the element's
/// text nodes — which is what the listing markup renders on separate
/// lines anyway.
fn text_lines(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve a possibly relative href against the page it came from.
fn absolute_url(base: &str, href: &str) -> Option<String> {
    let base = reqwest::Url::parse(base).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::absolute_url;

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://www.meetup.com", "/chtijug/events/123/").as_deref(),
            Some("https://www.meetup.com/chtijug/events/123/")
        );
        assert_eq!(
            absolute_url(
                "https://mobilizon.fr/@chtitedev",
                "https://mobilizon.fr/events/abc"
            )
            .as_deref(),
            Some("https://mobilizon.fr/events/abc")
        );
        assert_eq!(absolute_url("not a url", "/x"), None);
    }
}
