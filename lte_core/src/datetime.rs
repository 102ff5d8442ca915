//! Normalization of heterogeneous date representations.
//!
//! Sources emit anything from RFC 3339 timestamps to rendered listing
//! fragments like `"Tue, Jan 20 · 5:30 PM UTC"`. Parsing is a ladder
//! of attempts, first match wins, and an unparsable value is `None`
//! rather than an error: dropped items are expected noise from
//! heuristic extraction, not an error condition.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::event::RawTime;

/// Listing-page date fragments: optional weekday, month name, day,
/// 12-hour clock and an optional zone token.
static LISTING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*,\s*)?([a-zA-Z]+)\.?\s+(\d{1,2})\s*·\s*(\d{1,2}):(\d{2})\s*(am|pm)(?:\s+[a-zA-Z/_]+)?$",
    )
    .unwrap()
});

/// Month abbreviations used by the vendor events page. The page is
/// French and never spells months out; abbreviated names are too
/// language-specific to resolve through locale parsing, so they go
/// through a fixed lookup table (accented and plain spellings).
static FRENCH_MONTH_ABBREVIATIONS: &[(&str, u32)] = &[
    ("janv", 1),
    ("févr", 2),
    ("fevr", 2),
    ("mars", 3),
    ("avr", 4),
    ("mai", 5),
    ("juin", 6),
    ("juil", 7),
    ("août", 8),
    ("aout", 8),
    ("sept", 9),
    ("oct", 10),
    ("nov", 11),
    ("déc", 12),
    ("dec", 12),
];

/// Resolve a raw platform time to an instant, or `None` if unparsable.
///
/// Textual values without an explicit offset resolve in UTC; the zone
/// token of listing fragments is matched but not interpreted.
pub fn normalize(raw: &RawTime, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match raw {
        RawTime::Stamp(instant) => Some(*instant),
        RawTime::Text(text) => normalize_text(text, now),
    }
}

fn normalize_text(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(instant) = DateTime::parse_from_rfc2822(text) {
        return Some(instant.with_timezone(&Utc));
    }
    // Machine-readable attributes sometimes come without an offset.
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    parse_listing_fragment(text, now)
}

/// Parse a fragment like `"Tue, Jan 20 · 5:30 PM UTC"`, assuming the
/// current year. The year-rollover rule does not apply here: listing
/// pages are trusted to only show upcoming dates.
fn parse_listing_fragment(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let captures = LISTING_PATTERN.captures(text)?;
    let month = month_from_name(&captures[1])?;
    let day: u32 = captures[2].parse().ok()?;
    let hour: u32 = captures[3].parse().ok()?;
    let minute: u32 = captures[4].parse().ok()?;
    let hour = to_24_hour(hour, captures[5].eq_ignore_ascii_case("pm"))?;
    Utc.with_ymd_and_hms(now.year(), month, day, hour, minute, 0)
        .single()
}

fn to_24_hour(hour: u32, pm: bool) -> Option<u32> {
    match (hour, pm) {
        (12, false) => Some(0),
        (12, true) => Some(12),
        (1..=11, false) => Some(hour),
        (1..=11, true) => Some(hour + 12),
        _ => None,
    }
}

/// Resolve an English month name to its calendar number by parsing a
/// synthetic date; chrono accepts full and abbreviated names alike.
pub fn month_from_name(name: &str) -> Option<u32> {
    NaiveDate::parse_from_str(&format!("{name} 1 2001"), "%B %d %Y")
        .ok()
        .map(|date| date.month())
}

/// Resolve a French month abbreviation (`"janv."`, `"sept"`, `"août"`)
/// to its calendar number.
///
/// An unknown abbreviation is `None` and must be treated as an
/// unresolved month by the caller, never defaulted.
pub fn month_from_abbreviation(abbreviation: &str) -> Option<u32> {
    let needle = abbreviation.trim().trim_end_matches('.').to_lowercase();
    if needle.is_empty() {
        return None;
    }
    FRENCH_MONTH_ABBREVIATIONS
        .iter()
        .find(|(abbreviation, _)| needle.starts_with(abbreviation))
        .map(|(_, month)| *month)
}

/// Build a date from month and day only, assuming upcoming-event
/// semantics: the current year, or the next one if that date already
/// passed. Must not be applied to explicitly dated sources.
pub fn resolve_month_day(month: u32, day: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let candidate = Utc
        .with_ymd_and_hms(now.year(), month, day, 0, 0, 0)
        .single()?;
    if candidate.date_naive() < now.date_naive() {
        return Utc
            .with_ymd_and_hms(now.year() + 1, month, day, 0, 0, 0)
            .single();
    }
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::{month_from_abbreviation, month_from_name, normalize, resolve_month_day};
    use crate::event::RawTime;

    fn mid_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_structured_value_passes_through() {
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
        assert_eq!(normalize(&RawTime::Stamp(instant), mid_2025()), Some(instant));
    }

    #[test]
    fn test_rfc3339_round_trip() {
        let text = "2025-03-01T18:00:00Z";
        let direct = DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc);
        assert_eq!(normalize(&RawTime::from(text), mid_2025()), Some(direct));
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let normalized = normalize(&RawTime::from("2025-03-01T19:00:00+01:00"), mid_2025());
        assert_eq!(
            normalized,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_offsetless_iso_is_utc() {
        let normalized = normalize(&RawTime::from("2025-03-01T18:00:00"), mid_2025());
        assert_eq!(
            normalized,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_listing_fragment() {
        let normalized = normalize(&RawTime::from("Tue, Jan 20 · 5:30 PM UTC"), mid_2025());
        assert_eq!(
            normalized,
            Some(Utc.with_ymd_and_hms(2025, 1, 20, 17, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_listing_fragment_without_weekday_or_zone() {
        let normalized = normalize(&RawTime::from("Mar 3 · 9:15 AM"), mid_2025());
        assert_eq!(
            normalized,
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 9, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_twelve_hour_conversion() {
        let midnight = normalize(&RawTime::from("Sun, Feb 2 · 12:00 AM UTC"), mid_2025());
        assert_eq!(
            midnight,
            Some(Utc.with_ymd_and_hms(2025, 2, 2, 0, 0, 0).unwrap())
        );
        let noon = normalize(&RawTime::from("Sun, Feb 2 · 12:00 PM UTC"), mid_2025());
        assert_eq!(
            noon,
            Some(Utc.with_ymd_and_hms(2025, 2, 2, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unparsable_is_none() {
        assert_eq!(normalize(&RawTime::from(""), mid_2025()), None);
        assert_eq!(normalize(&RawTime::from("   "), mid_2025()), None);
        assert_eq!(normalize(&RawTime::from("next tuesday-ish"), mid_2025()), None);
        assert_eq!(normalize(&RawTime::from("Tue, Jan 20 · 27:30 PM"), mid_2025()), None);
    }

    #[test]
    fn test_month_from_name() {
        assert_eq!(month_from_name("Jan"), Some(1));
        assert_eq!(month_from_name("January"), Some(1));
        assert_eq!(month_from_name("dec"), Some(12));
        assert_eq!(month_from_name("Brumaire"), None);
    }

    #[test]
    fn test_month_from_abbreviation() {
        assert_eq!(month_from_abbreviation("janv."), Some(1));
        assert_eq!(month_from_abbreviation("sept"), Some(9));
        assert_eq!(month_from_abbreviation("août"), Some(8));
        assert_eq!(month_from_abbreviation("aout"), Some(8));
        assert_eq!(month_from_abbreviation("Déc."), Some(12));
        assert_eq!(month_from_abbreviation("janvier"), Some(1));
    }

    #[test]
    fn test_unknown_abbreviation_is_unresolved() {
        assert_eq!(month_from_abbreviation("xyz"), None);
        assert_eq!(month_from_abbreviation(""), None);
        assert_eq!(month_from_abbreviation("."), None);
    }

    #[test]
    fn test_rollover_past_date_advances_a_year() {
        let resolved = resolve_month_day(2, 5, mid_2025()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2026, 2, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rollover_upcoming_date_stays_in_current_year() {
        let resolved = resolve_month_day(9, 18, mid_2025()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2025, 9, 18, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rollover_same_day_counts_as_upcoming() {
        let resolved = resolve_month_day(6, 15, mid_2025()).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rollover_invalid_day_is_none() {
        assert_eq!(resolve_month_day(2, 31, mid_2025()), None);
    }
}
