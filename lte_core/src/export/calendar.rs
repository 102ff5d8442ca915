//! ICS rendering of the canonical event set.

use chrono::{DateTime, Duration, Utc};
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, Property},
    ical_property,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::event::CanonicalEvent;

const PROD_ID: &str = "-//Lille Tech Events//lille-tech-communities.fr";
const UID_DOMAIN: &str = "lille-tech-communities.fr";
/// UTC instants in the compact form the calendar format wants.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

static NON_UID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new("[^A-Za-z0-9]+").unwrap());

/// Assemble the aggregated calendar. Event order follows the input.
pub fn build<'a>(events: impl IntoIterator<Item = &'a CanonicalEvent>) -> IcalCalendar {
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PROD_ID)
        .build();
    calendar.events = events.into_iter().map(to_ical_event).collect();
    calendar
}

fn to_ical_event(event: &CanonicalEvent) -> IcalEvent {
    let end_time = event
        .end_time
        .unwrap_or_else(|| event.start_time + Duration::hours(1));
    let mut ical_event = IcalEvent::default();
    ical_event.properties.push(ical_property!("UID", uid(&event.link)));
    ical_event
        .properties
        .push(ical_property!("DTSTAMP", timestamp(Utc::now())));
    ical_event
        .properties
        .push(ical_property!("DTSTART", timestamp(event.start_time)));
    ical_event
        .properties
        .push(ical_property!("DTEND", timestamp(end_time)));
    ical_event
        .properties
        .push(ical_property!("SUMMARY", event.title.clone()));
    ical_event
        .properties
        .push(ical_property!("DESCRIPTION", event.title.clone()));
    ical_event
        .properties
        .push(ical_property!("URL", event.link.clone()));
    if let Some(location) = &event.location {
        ical_event
            .properties
            .push(ical_property!("LOCATION", location.clone()));
    }
    ical_event
}

fn timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Stable identifier derived from the event link, so re-harvesting
/// updates events in subscribed calendars instead of duplicating them.
fn uid(link: &str) -> String {
    let slug = NON_UID_CHARS.replace_all(link, "-");
    format!("{}@{UID_DOMAIN}", slug.trim_matches('-'))
}
