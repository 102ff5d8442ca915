//! Vendor landing page for the EuraTechnologies campus.
//!
//! The page mixes past and upcoming programming; only the upcoming
//! section is harvested. Cards carry day and month fragments (French
//! abbreviations) instead of full timestamps, so dates are resolved
//! against the harvest instant.

use anyhow::Result;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::{absolute_url, text_lines};
use crate::{
    browser::Browser,
    datetime::{month_from_abbreviation, resolve_month_day},
    event::{RawExtraction, RawTime},
};

pub const EVENTS_URL: &str = "https://www.euratechnologies.com/evenements/";

static SECTION: Lazy<Selector> = Lazy::new(|| Selector::parse("section").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3").unwrap());
static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static CARD_FALLBACK: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"[class*="card"]"#).unwrap());
static TITLE_CHILD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"h3, h4, [class*="title"]"#).unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static MONTH_FRAGMENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="month"]"#).unwrap());
static DAY_FRAGMENT: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"[class*="day"]"#).unwrap());
static LOCATION_FRAGMENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[class*="location"], [class*="lieu"]"#).unwrap());

/// A date written inline, like `"18 sept."` or `"5 févr. 2026"`.
static DATE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s+([\p{L}]+)\.?").unwrap());

/// Scrape the campus events page.
pub async fn extract(browser: &Browser) -> Result<Vec<RawExtraction>> {
    let page = browser.new_page().await?;
    let snapshot = async {
        page.goto(EVENTS_URL).await?;
        page.wait_for("section").await?;
        page.source().await
    }
    .await;
    page.close().await;
    Ok(parse_events_page(&snapshot?, Utc::now()))
}

/// Pull the upcoming-section cards out of a page snapshot. Cards whose
/// month fragment cannot be resolved are dropped.
pub fn parse_events_page(html: &str, now: DateTime<Utc>) -> Vec<RawExtraction> {
    let document = Html::parse_document(html);
    let Some(section) = upcoming_section(&document) else {
        warn!("no upcoming section found on vendor events page");
        return Vec::new();
    };
    let mut cards: Vec<ElementRef<'_>> = section.select(&CARD).collect();
    if cards.is_empty() {
        cards = section.select(&CARD_FALLBACK).collect();
    }
    cards
        .into_iter()
        .filter_map(|card| parse_card(card, now))
        .collect()
}

/// The first section whose heading reads as upcoming, in either
/// language the page has shipped with.
fn upcoming_section<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
    document.select(&SECTION).find(|section| {
        section.select(&HEADING).any(|heading| {
            let text = text_lines(heading).join(" ").to_lowercase();
            text.contains("venir") || text.contains("upcoming")
        })
    })
}

fn parse_card(card: ElementRef<'_>, now: DateTime<Utc>) -> Option<RawExtraction> {
    let title = card
        .select(&TITLE_CHILD)
        .next()
        .map(|heading| text_lines(heading).join(" "))
        .filter(|text| !text.is_empty())?;
    let link = card
        .select(&LINK)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| absolute_url(EVENTS_URL, href))?;
    let start = card_date(card, now)?;
    let location = card
        .select(&LOCATION_FRAGMENT)
        .next()
        .map(|fragment| text_lines(fragment).join(", "))
        .filter(|text| !text.is_empty());
    Some(RawExtraction {
        title,
        link,
        raw_time: RawTime::Stamp(start),
        raw_end_time: None,
        location,
    })
}

/// Date strategies in order: dedicated day and month fragments, then
/// a date written inline in the card text.
fn card_date(card: ElementRef<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let fragments = card.select(&DAY_FRAGMENT).next().zip(card.select(&MONTH_FRAGMENT).next());
    let (day, month_text) = if let Some((day, month)) = fragments {
        (
            text_lines(day).join(" ").trim().parse::<u32>().ok()?,
            text_lines(month).join(" "),
        )
    } else {
        let text = text_lines(card).join(" ");
        let captures = DATE_LINE.captures(&text)?;
        (captures[1].parse().ok()?, captures[2].to_string())
    };
    let Some(month) = month_from_abbreviation(&month_text) else {
        warn!(month = %month_text, "unresolved month abbreviation, dropping card");
        return None;
    };
    resolve_month_day(month, day, now)
}
