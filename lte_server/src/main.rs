use std::{env, net::SocketAddr, path::PathBuf, process::exit, sync::Arc};

use axum::{routing::get, Router};
use lte_core::{harvest::HarvestConfig, registry::SourceRegistry};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod route;

/// Shared immutable state: the configuration is read once at startup,
/// each request triggers a fresh harvest over it.
pub struct AppState {
    pub registry: SourceRegistry,
    pub config: HarvestConfig,
    pub site_url: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let sources_path =
        PathBuf::from(env::var("LTE_SOURCES").unwrap_or_else(|_| "sources.toml".to_string()));
    let registry = match SourceRegistry::load(&sources_path) {
        Ok(registry) => registry,
        Err(err) => {
            error!(error = ?err, "source configuration unusable");
            exit(1);
        }
    };
    let mut config = HarvestConfig::default();
    if let Ok(webdriver_url) = env::var("LTE_WEBDRIVER_URL") {
        config.webdriver_url = webdriver_url;
    }
    let site_url = env::var("LTE_SITE_URL")
        .unwrap_or_else(|_| "https://lille-tech-communities.fr".to_string());
    let port = env::var("LTE_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8008);

    let state = Arc::new(AppState {
        registry,
        config,
        site_url,
    });
    let app = Router::new()
        .route("/calendar.ics", get(route::calendar::handler))
        .route("/community.xml", get(route::feed::handler))
        .with_state(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "listening");
    if let Err(err) = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
    {
        error!(error = ?err, "server terminated");
        exit(1);
    }
}
