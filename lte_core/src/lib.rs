//! This crate aggregates event listings published by independent tech
//! communities across several hosting platforms — meetup-style and
//! mobilizon-style rendered listing pages, a calendar API and a vendor
//! landing page — into one canonical event collection.
//! The collection feeds an iCalendar export and an aggregated RSS feed.
//!
//! Extraction is best-effort by design: none of the rendered platforms
//! expose a stable machine-readable schema, so each source is scraped
//! heuristically and a broken source only ever costs its own events,
//! never the whole harvest run.

pub use ical;

pub mod adapters;
pub mod browser;
pub mod datetime;
pub mod event;
pub mod export;
pub mod harvest;
pub mod registry;
