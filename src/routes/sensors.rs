use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::bridge::{HistoricalEntry, LiveView};
use crate::common::AppState;
use crate::context::RequestContext;
use crate::error::AppResult;
use crate::evaluation::ThresholdSet;
use crate::reports::latest_readings;
use crate::settings::load_thresholds;
use crate::views;

/// History rows rendered under the live cards.
const PAGE_HISTORY_ROWS: u32 = 50;

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Number of rows (default 50, max 500)
    pub limit: Option<u32>,
}

/// Thresholds for page rendering: a failed read degrades to the defaults.
async fn thresholds_or_default(state: &AppState) -> ThresholdSet {
    load_thresholds(&state.db).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load thresholds, using defaults");
        ThresholdSet::default()
    })
}

/// Sensors page
///
/// Live bridge readings classified against the current thresholds, the latest
/// persisted reading of every active sensor, and recent bridge history.
#[utoipa::path(
    get,
    path = "/sensors",
    responses(
        (status = 200, description = "Sensors page", content_type = "text/html"),
        (status = 303, description = "Not signed in; redirect to login"),
    ),
    tag = "sensors"
)]
pub async fn sensors_page(State(state): State<AppState>, ctx: RequestContext) -> Html<String> {
    let thresholds = thresholds_or_default(&state).await;

    let (live, history, latest) = futures::future::join3(
        state.live.current(&thresholds),
        state.live.history(PAGE_HISTORY_ROWS),
        latest_readings(&state.db),
    )
    .await;

    let latest = latest.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load latest sensor readings");
        Vec::new()
    });
    let evaluated: Vec<_> = latest
        .into_iter()
        .map(|sensor| {
            let evaluation = sensor.evaluate(&thresholds);
            (sensor, evaluation)
        })
        .collect();

    Html(views::sensors_page(&ctx, &live, &evaluated, &history))
}

/// Live readings as JSON
///
/// Same classification as the sensors page, for polling. A bridge outage is
/// reported through `status`, never as an error.
#[utoipa::path(
    get,
    path = "/api/sensors/live",
    responses(
        (status = 200, description = "Live readings", body = LiveView),
    ),
    tag = "sensors"
)]
pub async fn live_readings(State(state): State<AppState>, _ctx: RequestContext) -> Json<LiveView> {
    let thresholds = thresholds_or_default(&state).await;
    Json(state.live.current(&thresholds).await)
}

/// Bridge history as JSON
#[utoipa::path(
    get,
    path = "/api/sensors/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recent bridge history", body = Vec<HistoricalEntry>),
        (status = 502, description = "Sensor bridge unavailable"),
    ),
    tag = "sensors"
)]
pub async fn history(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoricalEntry>>> {
    let rows = state
        .live
        .client()
        .get_historical(query.limit.unwrap_or(PAGE_HISTORY_ROWS))
        .await?;
    Ok(Json(rows))
}
