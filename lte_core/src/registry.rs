//! Declarative source configuration, read once per harvest run.

use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use bitmask_enum::bitmask;
use regex::RegexBuilder;
use serde::Deserialize;

/// The enumerated category of an event source; decides which adapter
/// and extraction heuristics apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKind {
    Meetup,
    Mobilizon,
    CalendarApi,
    VendorPage,
}

impl PlatformKind {
    /// Grouping order of a harvest run.
    pub const ALL: [PlatformKind; 4] = [
        PlatformKind::Meetup,
        PlatformKind::Mobilizon,
        PlatformKind::CalendarApi,
        PlatformKind::VendorPage,
    ];

    /// Whether this platform needs the shared automation session.
    pub fn requires_browser(self) -> bool {
        !matches!(self, PlatformKind::CalendarApi)
    }

    /// Whether sources of this platform carry a listing URL or
    /// identifier of their own. The vendor page is a fixed URL.
    pub fn requires_locator(self) -> bool {
        !matches!(self, PlatformKind::VendorPage)
    }
}

/// Platform set for excluding whole platforms from a run.
#[bitmask]
pub enum PlatformKindBitmask {
    Meetup,
    Mobilizon,
    CalendarApi,
    VendorPage,
}

impl From<PlatformKind> for PlatformKindBitmask {
    fn from(value: PlatformKind) -> Self {
        match value {
            PlatformKind::Meetup => PlatformKindBitmask::Meetup,
            PlatformKind::Mobilizon => PlatformKindBitmask::Mobilizon,
            PlatformKind::CalendarApi => PlatformKindBitmask::CalendarApi,
            PlatformKind::VendorPage => PlatformKindBitmask::VendorPage,
        }
    }
}

/// One harvestable community group.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDescriptor {
    /// Unique and stable across runs.
    pub id: String,
    /// Display name; becomes the canonical events' source label.
    pub label: String,
    pub platform: PlatformKind,
    /// Platform-specific: meetup slug, mobilizon group URL or calendar
    /// identifier.
    pub locator: Option<String>,
    /// Case-insensitive regular expression tested against titles.
    pub title_filter: Option<String>,
    /// Case-insensitive regular expression tested against locations
    /// (the vendor-page platform).
    pub location_filter: Option<String>,
}

/// An external syndication feed merged into the community feed export.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDescriptor {
    pub name: String,
    pub url: String,
}

/// The full configuration of a harvest run: sources and feeds.
/// Immutable once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRegistry {
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceDescriptor>,
    #[serde(default, rename = "feed")]
    pub feeds: Vec<FeedDescriptor>,
}

impl SourceRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading source configuration {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let registry: SourceRegistry =
            toml::from_str(text).context("parsing source configuration")?;
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        let mut seen_ids = HashSet::new();
        for descriptor in &self.sources {
            if !seen_ids.insert(descriptor.id.as_str()) {
                bail!("duplicate source id '{}'", descriptor.id);
            }
            if descriptor.platform.requires_locator() && descriptor.locator.is_none() {
                bail!("source '{}' needs a locator for its platform", descriptor.id);
            }
            for filter in [&descriptor.title_filter, &descriptor.location_filter]
                .into_iter()
                .flatten()
            {
                RegexBuilder::new(filter)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| {
                        format!("invalid filter /{}/ on source '{}'", filter, descriptor.id)
                    })?;
            }
        }
        Ok(())
    }

    /// Descriptors in harvest order: grouped by platform kind, then in
    /// declaration order within each kind.
    pub fn grouped(&self) -> Vec<&SourceDescriptor> {
        PlatformKind::ALL
            .iter()
            .flat_map(|kind| {
                self.sources
                    .iter()
                    .filter(move |descriptor| descriptor.platform == *kind)
            })
            .collect()
    }

    /// Copy of the registry without the masked platforms.
    pub fn without(&self, excluded: PlatformKindBitmask) -> Self {
        Self {
            sources: self
                .sources
                .iter()
                .filter(|descriptor| !excluded.contains(descriptor.platform.into()))
                .cloned()
                .collect(),
            feeds: self.feeds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlatformKind, PlatformKindBitmask, SourceRegistry};

    static SAMPLE: &str = r#"
[[source]]
id = "chtitedev"
label = "Ch'tite Dev"
platform = "mobilizon"
locator = "https://mobilizon.fr/@chtitedev"

[[source]]
id = "chtijug"
label = "Ch'ti JUG"
platform = "meetup"
locator = "chtijug"
title_filter = "java|jvm"

[[source]]
id = "euratech"
label = "EuraTechnologies"
platform = "vendor-page"
location_filter = "lille"

[[source]]
id = "lille-ai"
label = "Lille AI"
platform = "calendar-api"
locator = "cal-abc123"

[[feed]]
name = "Ch'ti JUG Blog"
url = "https://chtijug.org/feed.xml"
"#;

    #[test]
    fn test_from_toml_str() {
        let registry = SourceRegistry::from_toml_str(SAMPLE).unwrap();
        assert_eq!(registry.sources.len(), 4);
        assert_eq!(registry.feeds.len(), 1);
        let jug = &registry.sources[1];
        assert_eq!(jug.platform, PlatformKind::Meetup);
        assert_eq!(jug.locator.as_deref(), Some("chtijug"));
        assert_eq!(jug.title_filter.as_deref(), Some("java|jvm"));
    }

    #[test]
    fn test_grouped_orders_by_platform_then_declaration() {
        let registry = SourceRegistry::from_toml_str(SAMPLE).unwrap();
        let ids: Vec<&str> = registry
            .grouped()
            .iter()
            .map(|descriptor| descriptor.id.as_str())
            .collect();
        assert_eq!(ids, ["chtijug", "chtitedev", "lille-ai", "euratech"]);
    }

    #[test]
    fn test_without_masks_platforms() {
        let registry = SourceRegistry::from_toml_str(SAMPLE).unwrap();
        let filtered =
            registry.without(PlatformKindBitmask::Meetup | PlatformKindBitmask::VendorPage);
        let ids: Vec<&str> = filtered
            .sources
            .iter()
            .map(|descriptor| descriptor.id.as_str())
            .collect();
        assert_eq!(ids, ["chtitedev", "lille-ai"]);
        assert_eq!(filtered.feeds.len(), 1);
    }

    #[test]
    fn test_missing_locator_is_rejected() {
        let result = SourceRegistry::from_toml_str(
            r#"
[[source]]
id = "nowhere"
label = "Nowhere"
platform = "meetup"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let result = SourceRegistry::from_toml_str(
            r#"
[[source]]
id = "broken"
label = "Broken"
platform = "meetup"
locator = "broken"
title_filter = "(unclosed"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let result = SourceRegistry::from_toml_str(
            r#"
[[source]]
id = "twice"
label = "Once"
platform = "meetup"
locator = "a"

[[source]]
id = "twice"
label = "Again"
platform = "meetup"
locator = "b"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_platform_capabilities() {
        assert!(PlatformKind::Meetup.requires_browser());
        assert!(PlatformKind::VendorPage.requires_browser());
        assert!(!PlatformKind::CalendarApi.requires_browser());
        assert!(!PlatformKind::VendorPage.requires_locator());
    }
}
