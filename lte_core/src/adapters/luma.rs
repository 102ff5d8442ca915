//! Calendar API client.
//!
//! The only adapter that needs no browser session: upcoming entries
//! come from a JSON endpoint keyed by the calendar's API identifier.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    event::{RawExtraction, RawTime},
    registry::SourceDescriptor,
};

pub const DEFAULT_API_BASE: &str = "https://api.lu.ma";
const EVENT_BASE_URL: &str = "https://lu.ma";
const PAGINATION_LIMIT: &str = "50";

#[derive(Debug, Deserialize)]
struct CalendarItems {
    #[serde(default)]
    entries: Vec<CalendarEntry>,
}

#[derive(Debug, Deserialize)]
struct CalendarEntry {
    event: ApiEvent,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    name: String,
    url: String,
    start_at: String,
    #[serde(default)]
    end_at: Option<String>,
}

/// Fetch the upcoming entries of one calendar.
pub async fn extract(descriptor: &SourceDescriptor, api_base: &str) -> Result<Vec<RawExtraction>> {
    let calendar_api_id = descriptor
        .locator
        .as_deref()
        .context("calendar-api source has no calendar identifier")?;
    let response = reqwest::Client::new()
        .get(format!("{}/calendar/get-items", api_base.trim_end_matches('/')))
        .query(&[
            ("calendar_api_id", calendar_api_id),
            ("period", "future"),
            ("pagination_limit", PAGINATION_LIMIT),
        ])
        .send()
        .await?
        .error_for_status()?;
    let items: CalendarItems = response.json().await?;
    Ok(map_entries(items))
}

fn map_entries(items: CalendarItems) -> Vec<RawExtraction> {
    items
        .entries
        .into_iter()
        .map(|entry| {
            let event = entry.event;
            // The API sometimes returns a bare slug instead of a full URL.
            let link = if event.url.starts_with("http") {
                event.url
            } else {
                format!("{EVENT_BASE_URL}/{}", event.url.trim_start_matches('/'))
            };
            RawExtraction {
                title: event.name,
                link,
                raw_time: RawTime::Text(event.start_at),
                raw_end_time: event.end_at.map(RawTime::Text),
                location: None,
            }
        })
        .collect()
}
