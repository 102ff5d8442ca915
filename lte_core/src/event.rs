//! Data model of the harvesting pipeline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A time value as a platform emitted it, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTime {
    /// Textual representation, format unknown until parsed.
    Text(String),
    /// Already structured instant.
    Stamp(DateTime<Utc>),
}

impl From<&str> for RawTime {
    fn from(value: &str) -> Self {
        RawTime::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for RawTime {
    fn from(value: DateTime<Utc>) -> Self {
        RawTime::Stamp(value)
    }
}

/// What a platform adapter managed to pull out of one listing entry.
///
/// An extraction with an empty title or an unparsable time is never
/// promoted into the canonical set.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExtraction {
    pub title: String,
    pub link: String,
    pub raw_time: RawTime,
    pub raw_end_time: Option<RawTime>,
    pub location: Option<String>,
}

/// The normalized, platform-agnostic event record consumed by the
/// exporters.
///
/// `end_time` is resolved to start + 1 hour during promotion when the
/// source provides none; it stays optional so that pre-normalized
/// collections (locally authored events) may omit it and get the same
/// fallback at the export boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub title: String,
    pub link: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_label: String,
    pub location: Option<String>,
}

impl CanonicalEvent {
    /// End of the event, defaulting to one hour after the start.
    pub fn end_or_default(&self) -> DateTime<Utc> {
        self.end_time
            .unwrap_or_else(|| self.start_time + Duration::hours(1))
    }
}

/// Why a source contributed zero events when extraction itself failed,
/// as opposed to a source that genuinely listed nothing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceFailure {
    /// The platform needs the shared automation session and none is
    /// available in this run.
    #[error("browser session unavailable")]
    SessionUnavailable,
    /// The platform call or the extraction raised an error.
    #[error("extraction failed: {0}")]
    Extraction(String),
}

/// Per-source unit of isolation: exactly one per descriptor and run,
/// whether extraction succeeded or not.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResult {
    pub source_id: String,
    pub events: Vec<CanonicalEvent>,
    pub failure: Option<SourceFailure>,
}

impl SourceResult {
    pub fn ok(source_id: String, events: Vec<CanonicalEvent>) -> Self {
        Self {
            source_id,
            events,
            failure: None,
        }
    }

    pub fn failed(source_id: String, failure: SourceFailure) -> Self {
        Self {
            source_id,
            events: Vec::new(),
            failure: Some(failure),
        }
    }
}

/// The full output of one harvest run, in registry iteration order:
/// grouped by platform kind, then per-platform declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestOutcome {
    pub results: Vec<SourceResult>,
}

impl HarvestOutcome {
    /// All canonical events across all sources, in outcome order.
    pub fn events(&self) -> impl Iterator<Item = &CanonicalEvent> {
        self.results.iter().flat_map(|result| result.events.iter())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{CanonicalEvent, HarvestOutcome, SourceFailure, SourceResult};

    fn event(title: &str) -> CanonicalEvent {
        CanonicalEvent {
            title: title.to_string(),
            link: format!("https://example.org/{title}"),
            start_time: Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap(),
            end_time: None,
            source_label: "Test".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_end_or_default() {
        let mut with_end = event("a");
        with_end.end_time = Some(Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap());
        assert_eq!(with_end.end_or_default(), with_end.end_time.unwrap());

        let without_end = event("b");
        assert_eq!(
            without_end.end_or_default(),
            without_end.start_time + Duration::hours(1)
        );
    }

    #[test]
    fn test_outcome_events_preserve_order() {
        let outcome = HarvestOutcome {
            results: vec![
                SourceResult::ok("first".to_string(), vec![event("a"), event("b")]),
                SourceResult::failed(
                    "second".to_string(),
                    SourceFailure::Extraction("boom".to_string()),
                ),
                SourceResult::ok("third".to_string(), vec![event("c")]),
            ],
        };
        let titles: Vec<&str> = outcome.events().map(|event| event.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[test]
    fn test_canonical_event_json_round_trip() {
        let text = r#"{
            "title": "Crafting session",
            "link": "https://example.org/crafting",
            "start_time": "2025-03-01T18:00:00Z",
            "end_time": null,
            "location": null
        }"#;
        let event: CanonicalEvent = serde_json::from_str(text).unwrap();
        assert_eq!(event.title, "Crafting session");
        assert_eq!(event.source_label, "");
        assert!(event.end_time.is_none());
    }
}
