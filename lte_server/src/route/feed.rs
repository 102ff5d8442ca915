use std::sync::Arc;

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use lte_core::{export::feed, harvest};

use crate::AppState;

/// Handle community feed requests: harvested events merged with the
/// configured external feeds.
pub async fn handler(State(state): State<Arc<AppState>>) -> Response {
    let outcome = harvest::run(&state.registry, &state.config).await;
    let mut items = feed::harvest_items(&outcome);
    for descriptor in &state.registry.feeds {
        items.extend(feed::fetch_feed_items(descriptor).await);
    }
    let xml = feed::render(
        &state.site_url,
        "/community.xml",
        feed::CHANNEL_TITLE,
        feed::CHANNEL_DESCRIPTION,
        items,
    );
    ([(CONTENT_TYPE, "application/rss+xml; charset=utf-8")], xml).into_response()
}
