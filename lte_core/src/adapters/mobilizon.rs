//! Mobilizon group pages (federation-style rendered listings).
//!
//! Event anchors link to detail pages whose URL ends in an opaque
//! identifier. The card markup varies between instances, so the time
//! marker is searched on the anchor first and then up the ancestor
//! chain.

use std::collections::HashSet;

use anyhow::{Context, Result};
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

/// How many ancestor levels to search for the card's time marker; it
/// is not reliably a descendant or sibling of the anchor.
const ANCESTOR_SEARCH_DEPTH: usize = 5;

static EVENT_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/events/"]"#).unwrap());
static TITLE_CHILD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"h3, h4, [class*="title"]"#).unwrap());
static TIME_MARKER: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
/// Detail-page URLs end in an opaque hex identifier; everything else
/// under `/events/` is navigation.
static EVENT_DETAIL_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"/events/[a-f0-9-]+$").unwrap());

/// Scrape one group's event index.
pub async fn extract(
    browser: &Browser,
    descriptor: &SourceDescriptor,
) -> Result<Vec<RawExtraction>> {
    let group_url = descriptor
        .locator
        .as_deref()
        .context("mobilizon source has no group URL")?;
    let page = browser.new_page().await?;
    let snapshot = async {
        page.goto(&format!("{}/events", group_url.trim_end_matches('/')))
            .await?;
        if !page.wait_for(r#"a[href*="/events/"]"#).await? {
            debug!(source = %descriptor.id, "no event anchors appeared, proceeding with current page state");
        }
        page.source().await
    }
    .await;
    page.close().await;
    Ok(parse_group_page(&snapshot?, group_url))
}

/// Pull raw event entries out of a group page snapshot, deduplicating
/// anchors that point at the same detail URL.
pub fn parse_group_page(html: &str, group_url: &str) -> Vec<RawExtraction> {
    let document = Html::parse_document(html);
    let mut seen_links = HashSet::new();
    let mut extractions = Vec::new();
    for anchor in document.select(&EVENT_ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(link) = absolute_url(group_url, href) else {
            continue;
        };
        if !EVENT_DETAIL_URL.is_match(&link) {
            continue;
        }
        if !seen_links.insert(link.clone()) {
            continue;
        }
        let Some(title) = card_title(anchor) else {
            continue;
        };
        let Some(datetime) = time_near(anchor, group_url, &link) else {
            continue;
        };
        extractions.push(RawExtraction {
            title,
            link,
            raw_time: RawTime::Text(datetime),
            raw_end_time: None,
            location: None,
        });
    }
    extractions
}

/// Title strategies in order: a heading-like descendant, then the
/// first non-empty text line of the anchor.
fn card_title(anchor: ElementRef<'_>) -> Option<String> {
    if let Some(heading) = anchor.select(&TITLE_CHILD).next() {
        let text = text_lines(heading).join(" ");
        if !text.is_empty() {
            return Some(text);
        }
    }
    text_lines(anchor).into_iter().next()
}

/// Time strategies in order: a marker nested in the anchor itself,
/// then the closest containing blocks up to a bounded depth. The
/// ascent stops at the card boundary: once an ancestor also contains
/// a detail anchor for a different event, any marker found there
/// would belong to a sibling card.
fn time_near(anchor: ElementRef<'_>, group_url: &str, link: &str) -> Option<String> {
    if let Some(datetime) = marker_datetime(anchor) {
        return Some(datetime);
    }
    for ancestor in anchor
        .ancestors()
        .take(ANCESTOR_SEARCH_DEPTH)
        .filter_map(ElementRef::wrap)
    {
        if contains_foreign_event_anchor(ancestor, group_url, link) {
            return None;
        }
        if let Some(datetime) = marker_datetime(ancestor) {
            return Some(datetime);
        }
    }
    None
}

fn contains_foreign_event_anchor(container: ElementRef<'_>, group_url: &str, link: &str) -> bool {
    container.select(&EVENT_ANCHOR).any(|anchor| {
        anchor
            .value()
            .attr("href")
            .and_then(|href| absolute_url(group_url, href))
            .map_or(false, |other| {
                EVENT_DETAIL_URL.is_match(&other) && other != link
            })
    })
}

fn marker_datetime(element: ElementRef<'_>) -> Option<String> {
    element
        .select(&TIME_MARKER)
        .next()
        .and_then(|marker| marker.value().attr("datetime"))
        .map(str::to_string)
        .filter(|datetime| !datetime.is_empty())
}
