//! RSS rendering of the aggregated feed: harvested events merged with
//! items pulled from the configured external feeds.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::{
    event::{CanonicalEvent, HarvestOutcome},
    registry::FeedDescriptor,
};

pub const CHANNEL_TITLE: &str = "Lille Tech Communities - Agrégateur";
pub const CHANNEL_DESCRIPTION: &str = "Flux RSS agrégé des communautés tech de Lille";

static ITEM_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item>(.*?)</item>").unwrap());
static TITLE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title>(?:\s*<!\[CDATA\[(.*?)\]\]>\s*|(.*?))</title>").unwrap()
});
static LINK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link>(.*?)</link>").unwrap());
static DESCRIPTION_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<description>(?:\s*<!\[CDATA\[(.*?)\]\]>\s*|(.*?))</description>").unwrap()
});
static PUB_DATE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pubDate>(.*?)</pubDate>").unwrap());

/// One channel item of the aggregated feed, wherever it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub pub_date: DateTime<Utc>,
    pub description: Option<String>,
    pub source: String,
}

/// Items for every harvested event of a run.
pub fn harvest_items(outcome: &HarvestOutcome) -> Vec<FeedItem> {
    outcome.events().map(event_item).collect()
}

/// Item for one canonical event: published at its start time.
pub fn event_item(event: &CanonicalEvent) -> FeedItem {
    FeedItem {
        title: event.title.clone(),
        link: event.link.clone(),
        pub_date: event.start_time,
        description: None,
        source: event.source_label.clone(),
    }
}

/// Fetch and parse one external feed. Best effort: any failure is
/// logged and contributes zero items, never a failed export.
pub async fn fetch_feed_items(descriptor: &FeedDescriptor) -> Vec<FeedItem> {
    let response = match reqwest::get(&descriptor.url).await {
        Ok(response) => match response.error_for_status() {
            Ok(response) => response,
            Err(err) => {
                warn!(feed = %descriptor.name, error = %err, "external feed rejected the request");
                return Vec::new();
            }
        },
        Err(err) => {
            warn!(feed = %descriptor.name, error = %err, "external feed unreachable");
            return Vec::new();
        }
    };
    match response.text().await {
        Ok(xml) => parse_feed(&xml, &descriptor.name),
        Err(err) => {
            warn!(feed = %descriptor.name, error = %err, "external feed body unreadable");
            Vec::new()
        }
    }
}

/// Lenient item extraction: title and link are required, everything
/// else has a fallback. Items without a parsable date sort as new.
pub fn parse_feed(xml: &str, source: &str) -> Vec<FeedItem> {
    ITEM_BLOCK
        .captures_iter(xml)
        .filter_map(|block| {
            let body = block.get(1)?.as_str();
            let title = tag_text(&TITLE_TAG, body)?;
            let link = tag_text(&LINK_TAG, body)?;
            let pub_date = tag_text(&PUB_DATE_TAG, body)
                .and_then(|text| DateTime::parse_from_rfc2822(&text).ok())
                .map(|parsed| parsed.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            Some(FeedItem {
                title,
                link,
                pub_date,
                description: tag_text(&DESCRIPTION_TAG, body),
                source: source.to_string(),
            })
        })
        .collect()
}

fn tag_text(tag: &Regex, body: &str) -> Option<String> {
    let captures = tag.captures(body)?;
    let text = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|capture| capture.as_str().trim().to_string())?;
    (!text.is_empty()).then_some(text)
}

/// Render the channel, newest item first.
pub fn render(
    site_url: &str,
    self_path: &str,
    title: &str,
    description: &str,
    mut items: Vec<FeedItem>,
) -> String {
    items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
    let rendered_items: String = items.iter().map(render_item).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{title}</title>
    <link>{site_url}</link>
    <description>{description}</description>
    <language>fr</language>
    <lastBuildDate>{build_date}</lastBuildDate>
    <atom:link href="{site_url}{self_path}" rel="self" type="application/rss+xml"/>
{rendered_items}  </channel>
</rss>
"#,
        build_date = Utc::now().to_rfc2822(),
    )
}

fn render_item(item: &FeedItem) -> String {
    let description = item
        .description
        .clone()
        .unwrap_or_else(|| format!("Événement proposé par {}", item.source));
    format!(
        r#"    <item>
      <title><![CDATA[{title}]]></title>
      <link>{link}</link>
      <guid isPermaLink="true">{link}</guid>
      <pubDate>{pub_date}</pubDate>
      <description><![CDATA[{description}]]></description>
      <source url="{link}"><![CDATA[{source}]]></source>
    </item>
"#,
        title = item.title,
        link = item.link,
        pub_date = item.pub_date.to_rfc2822(),
        source = item.source,
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{parse_feed, render, FeedItem};

    fn item(title: &str, day: u32) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            link: format!("https://example.org/{title}"),
            pub_date: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
            description: None,
            source: "Test".to_string(),
        }
    }

    #[test]
    fn test_render_sorts_newest_first() {
        let xml = render(
            "https://lille-tech-communities.fr",
            "/community.xml",
            "Agrégateur",
            "desc",
            vec![item("older", 1), item("newest", 20), item("middle", 10)],
        );
        let newest = xml.find("newest").unwrap();
        let middle = xml.find("middle").unwrap();
        let older = xml.find("older").unwrap();
        assert!(newest < middle);
        assert!(middle < older);
    }

    #[test]
    fn test_render_wraps_titles_in_cdata() {
        let xml = render(
            "https://lille-tech-communities.fr",
            "/community.xml",
            "Agrégateur",
            "desc",
            vec![item("a <b> title", 1)],
        );
        assert!(xml.contains("<title><![CDATA[a <b> title]]></title>"));
        assert!(xml.contains(r#"<atom:link href="https://lille-tech-communities.fr/community.xml""#));
    }

    #[test]
    fn test_parse_feed() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Blog</title>
  <item>
    <title><![CDATA[Release notes]]></title>
    <link>https://blog.example.org/release</link>
    <pubDate>Sat, 01 Mar 2025 12:00:00 +0000</pubDate>
    <description>Plain description</description>
  </item>
  <item>
    <title>No link, dropped</title>
  </item>
</channel></rss>"#;
        let items = parse_feed(xml, "Blog");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Release notes");
        assert_eq!(items[0].link, "https://blog.example.org/release");
        assert_eq!(
            items[0].pub_date,
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(items[0].description.as_deref(), Some("Plain description"));
        assert_eq!(items[0].source, "Blog");
    }
}
