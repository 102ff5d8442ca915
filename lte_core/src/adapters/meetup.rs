//! Meetup-style rendered listing pages.
//!
//! The listing is populated client-side and carries no stable schema;
//! event cards are anchors that link into the group's `/events/` path
//! and contain a `time` marker. Everything else is recovered
//! heuristically from the card text.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{absolute_url, text_lines};
use crate::{
    browser::Browser,
    event::{RawExtraction, RawTime},
    registry::SourceDescriptor,
};

const BASE_URL: &str = "https://www.meetup.com";

/// Navigation links that look like event anchors but are page chrome.
const CHROME_LABELS: [&str; 4] = ["Events", "List", "Calendar", "Upcoming"];

/// Minimum length for a text line to qualify as a title.
const MIN_TITLE_LENGTH: usize = 5;

static EVENT_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/events/"]"#).unwrap());
static TIME_MARKER: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static TITLE_CHILD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"h3, h4, [class*="title"]"#).unwrap());
/// Lines like "Wed, Mar 5 ..." are date lines, not titles.
static WEEKDAY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Mon|Tue|Wed|Thu|Fri|Sat|Sun),").unwrap());
/// Lines like "12 attendees" or "3 going".
static ATTENDEE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s+(attendee|going)").unwrap());
/// Zone-bracket suffix of the machine-readable attribute,
/// e.g. "2025-03-01T18:00:00+01:00[Europe/Paris]".
static ZONE_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*\]$").unwrap());

/// Scrape one group's upcoming-events listing.
pub async fn extract(
    browser: &Browser,
    descriptor: &SourceDescriptor,
) -> Result<Vec<RawExtraction>> {
    let slug = descriptor.locator.as_deref().unwrap_or(&descriptor.id);
    let page = browser.new_page().await?;
    let snapshot = async {
        page.goto(&format!("{BASE_URL}/{slug}/events/")).await?;
        if !page.wait_for("time").await? {
            debug!(source = %descriptor.id, "no time marker appeared, proceeding with current page state");
        }
        page.source().await
    }
    .await;
    page.close().await;
    Ok(parse_listing(&snapshot?, slug))
}

/// Pull raw event entries out of a listing snapshot.
pub fn parse_listing(html: &str, slug: &str) -> Vec<RawExtraction> {
    let document = Html::parse_document(html);
    let event_path = format!("/{slug}/events/");
    let mut extractions = Vec::new();
    for anchor in document.select(&EVENT_ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(link) = absolute_url(BASE_URL, href) else {
            continue;
        };
        if !link.contains(&event_path) {
            continue;
        }
        let lines = text_lines(anchor);
        if is_chrome(&lines) {
            continue;
        }
        let Some(time_marker) = anchor.select(&TIME_MARKER).next() else {
            continue;
        };
        let Some(datetime) = time_marker.value().attr("datetime") else {
            continue;
        };
        let raw_time = ZONE_BRACKET.replace(datetime, "").trim().to_string();
        if raw_time.is_empty() {
            continue;
        }
        let Some(title) = card_title(anchor, &lines) else {
            continue;
        };
        extractions.push(RawExtraction {
            title,
            link,
            raw_time: RawTime::Text(raw_time),
            raw_end_time: None,
            location: None,
        });
    }
    extractions
}

fn is_chrome(lines: &[String]) -> bool {
    match lines {
        [] => true,
        [only] => CHROME_LABELS.contains(&only.as_str()),
        _ => false,
    }
}

/// Title strategies in order: a dedicated title-bearing child, then a
/// scan of the card's text lines that skips capacity counters,
/// weekday-prefixed date lines and attendee counts — the first
/// surviving line of sufficient length wins.
fn card_title(anchor: ElementRef<'_>, lines: &[String]) -> Option<String> {
    if let Some(child) = anchor.select(&TITLE_CHILD).next() {
        let text = text_lines(child).join(" ");
        if !text.is_empty() {
            return Some(text);
        }
    }
    lines
        .iter()
        .find(|line| {
            line.len() > MIN_TITLE_LENGTH
                && !line.to_lowercase().contains("seats")
                && !WEEKDAY_LINE.is_match(line)
                && !ATTENDEE_LINE.is_match(line)
        })
        .cloned()
}
