use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lte_core::{
    event::CanonicalEvent,
    export::{calendar, feed},
    harvest::{self, HarvestConfig},
    ical::generator::Emitter,
    registry::{PlatformKindBitmask, SourceRegistry},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
pub struct Arguments {
    /// the source configuration file
    pub sources: PathBuf,
    /// directory the exports are written into
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
    /// the WebDriver endpoint for rendered listings
    #[arg(long, default_value = "http://localhost:9515")]
    pub webdriver_url: String,
    /// public base URL of the site the feed links back to
    #[arg(long, default_value = "https://lille-tech-communities.fr")]
    pub site_url: String,
    /// JSON file of locally authored events merged into the calendar
    #[arg(long)]
    pub local_events: Option<PathBuf>,
    /// exclude rendered meetup listings
    #[arg(long)]
    pub exclude_meetup: bool,
    /// exclude mobilizon group pages
    #[arg(long)]
    pub exclude_mobilizon: bool,
    /// exclude calendar API sources
    #[arg(long)]
    pub exclude_calendar_api: bool,
    /// exclude the vendor landing page
    #[arg(long)]
    pub exclude_vendor_page: bool,
}

impl From<&Arguments> for PlatformKindBitmask {
    fn from(value: &Arguments) -> Self {
        let mut platform_kind_bitmask = PlatformKindBitmask::none();
        if value.exclude_meetup {
            platform_kind_bitmask |= PlatformKindBitmask::Meetup;
        }
        if value.exclude_mobilizon {
            platform_kind_bitmask |= PlatformKindBitmask::Mobilizon;
        }
        if value.exclude_calendar_api {
            platform_kind_bitmask |= PlatformKindBitmask::CalendarApi;
        }
        if value.exclude_vendor_page {
            platform_kind_bitmask |= PlatformKindBitmask::VendorPage;
        }
        platform_kind_bitmask
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Arguments::parse();

    let registry =
        SourceRegistry::load(&args.sources)?.without(PlatformKindBitmask::from(&args));
    let local_events = match &args.local_events {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading local events {}", path.display()))?;
            serde_json::from_str::<Vec<CanonicalEvent>>(&text)
                .with_context(|| format!("parsing local events {}", path.display()))?
        }
        None => Vec::new(),
    };

    let config = HarvestConfig {
        webdriver_url: args.webdriver_url.clone(),
        ..HarvestConfig::default()
    };
    let outcome = harvest::run(&registry, &config).await;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating output directory {}", args.out_dir.display()))?;

    let ics = calendar::build(outcome.events().chain(local_events.iter())).generate();
    let calendar_path = args.out_dir.join("calendar.ics");
    fs::write(&calendar_path, ics)?;
    info!(path = %calendar_path.display(), "calendar written");

    let mut items = feed::harvest_items(&outcome);
    items.extend(local_events.iter().map(feed::event_item));
    for descriptor in &registry.feeds {
        items.extend(feed::fetch_feed_items(descriptor).await);
    }
    let xml = feed::render(
        &args.site_url,
        "/community.xml",
        feed::CHANNEL_TITLE,
        feed::CHANNEL_DESCRIPTION,
        items,
    );
    let feed_path = args.out_dir.join("community.xml");
    fs::write(&feed_path, xml)?;
    info!(path = %feed_path.display(), "community feed written");

    Ok(())
}
