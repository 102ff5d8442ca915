use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use lte_core::{
    export::calendar,
    harvest,
    ical::generator::Emitter,
    registry::PlatformKindBitmask,
};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ExcludeQueryParams {
    #[serde(default)]
    exclude_meetup: bool,
    #[serde(default)]
    exclude_mobilizon: bool,
    #[serde(default)]
    exclude_calendar_api: bool,
    #[serde(default)]
    exclude_vendor_page: bool,
}

impl From<&ExcludeQueryParams> for PlatformKindBitmask {
    fn from(value: &ExcludeQueryParams) -> Self {
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

/// Handle calendar requests.
///
/// Platforms may be excluded via `exclude_*` query parameters.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    Query(query_params): Query<ExcludeQueryParams>,
) -> Response {
    let registry = state
        .registry
        .without(PlatformKindBitmask::from(&query_params));
    let outcome = harvest::run(&registry, &state.config).await;
    let ics = calendar::build(outcome.events()).generate();
    ([(CONTENT_TYPE, "text/calendar")], ics).into_response()
}
