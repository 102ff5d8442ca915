//! One harvest run: extraction across all configured sources, then
//! promotion into the canonical event set.
//!
//! Sources are isolated from each other. A failing source yields a
//! [`SourceResult`] carrying its failure, never an aborted run; only a
//! failed browser launch (when the run needs one at all) is fatal.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use regex::RegexBuilder;
use tracing::{error, info, warn};

use crate::{
    adapters::{euratech, luma, meetup, mobilizon},
    browser::Browser,
    datetime,
    event::{CanonicalEvent, HarvestOutcome, RawExtraction, SourceFailure, SourceResult},
    registry::{PlatformKind, SourceDescriptor, SourceRegistry},
};

/// Endpoints a harvest run talks to. Defaults match production; tests
/// point them at unreachable addresses to exercise isolation.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub webdriver_url: String,
    pub calendar_api_base: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            calendar_api_base: luma::DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Run a full harvest over the registry's sources.
///
/// The browser session is launched only when at least one configured
/// source needs it and is torn down before returning.
pub async fn run(registry: &SourceRegistry, config: &HarvestConfig) -> HarvestOutcome {
    let descriptors = registry.grouped();
    let browser = if descriptors
        .iter()
        .any(|descriptor| descriptor.platform.requires_browser())
    {
        match Browser::launch(&config.webdriver_url).await {
            Ok(browser) => Some(browser),
            Err(err) => {
                error!(error = ?err, "browser launch failed, aborting harvest run");
                return HarvestOutcome::default();
            }
        }
    } else {
        None
    };

    let now = Utc::now();
    let mut results = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        info!(source = %descriptor.id, platform = ?descriptor.platform, "harvesting");
        match dispatch(browser.as_ref(), descriptor, config).await {
            Ok(raws) => {
                let events = promote(descriptor, raws, now);
                info!(source = %descriptor.id, events = events.len(), "harvested");
                results.push(SourceResult::ok(descriptor.id.clone(), events));
            }
            Err(failure) => {
                warn!(source = %descriptor.id, error = %failure, "source failed");
                results.push(SourceResult::failed(descriptor.id.clone(), failure));
            }
        }
    }

    if let Some(browser) = browser {
        browser.shutdown().await;
    }
    HarvestOutcome { results }
}

async fn dispatch(
    browser: Option<&Browser>,
    descriptor: &SourceDescriptor,
    config: &HarvestConfig,
) -> Result<Vec<RawExtraction>, SourceFailure> {
    let outcome = match descriptor.platform {
        PlatformKind::Meetup => meetup::extract(require_browser(browser)?, descriptor).await,
        PlatformKind::Mobilizon => mobilizon::extract(require_browser(browser)?, descriptor).await,
        PlatformKind::CalendarApi => luma::extract(descriptor, &config.calendar_api_base).await,
        PlatformKind::VendorPage => euratech::extract(require_browser(browser)?).await,
    };
    outcome.map_err(|err| SourceFailure::Extraction(format!("{err:#}")))
}

fn require_browser(browser: Option<&Browser>) -> Result<&Browser, SourceFailure> {
    browser.ok_or(SourceFailure::SessionUnavailable)
}

/// Promote raw extractions of one source into canonical events:
/// apply the source's filter, normalize times, resolve the missing-end
/// fallback. Entries that fail any step are dropped.
fn promote(
    descriptor: &SourceDescriptor,
    raws: Vec<RawExtraction>,
    now: DateTime<Utc>,
) -> Vec<CanonicalEvent> {
    raws.into_iter()
        .filter(|raw| !raw.title.trim().is_empty())
        .filter(|raw| passes_filter(descriptor, raw))
        .filter_map(|raw| {
            // Unparsable times are expected noise from heuristic
            // extraction; entries are dropped without logging.
            let start_time = datetime::normalize(&raw.raw_time, now)?;
            let end_time = raw
                .raw_end_time
                .as_ref()
                .and_then(|raw_end| datetime::normalize(raw_end, now))
                .unwrap_or_else(|| start_time + Duration::hours(1));
            Some(CanonicalEvent {
                title: raw.title,
                link: raw.link,
                start_time,
                end_time: Some(end_time),
                source_label: descriptor.label.clone(),
                location: raw.location,
            })
        })
        .collect()
}

/// Vendor pages filter on location (titles there are campus-wide and
/// generic); every other platform filters on the title.
fn passes_filter(descriptor: &SourceDescriptor, raw: &RawExtraction) -> bool {
    let (pattern, subject) = match descriptor.platform {
        PlatformKind::VendorPage => (
            descriptor.location_filter.as_deref(),
            raw.location.as_deref().unwrap_or(""),
        ),
        _ => (descriptor.title_filter.as_deref(), raw.title.as_str()),
    };
    let Some(pattern) = pattern else {
        return true;
    };
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(filter) => filter.is_match(subject),
        Err(err) => {
            warn!(source = %descriptor.id, error = %err, "invalid filter, keeping entry");
            true
        }
    }
}
