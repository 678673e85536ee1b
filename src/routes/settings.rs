use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::context::{clear_flash_cookie, read_flash, set_flash_cookie, RequestContext};
use crate::domain::SensorType;
use crate::error::{AppError, AppResult};
use crate::evaluation::{Threshold, ThresholdSet};
use crate::settings::{self as store, DEFAULT_LOGGING_INTERVAL_MINUTES};
use crate::views;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ThresholdForm {
    pub sensor_type: String,
    pub min: String,
    pub max: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoggingIntervalForm {
    pub minutes: String,
}

fn parse_number(field: &str, raw: &str) -> AppResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::BadRequest(format!("{field} must be a number")))
}

fn require_manager(ctx: &RequestContext) -> AppResult<()> {
    if ctx.role.can_manage_settings() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role '{}' cannot change settings",
            ctx.role
        )))
    }
}

/// Back to the settings page with the outcome queued as a flash message.
fn back_to_settings(outcome: AppResult<String>) -> Response {
    let message = match outcome {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(error = %e, "Settings update rejected");
            e.user_message()
        }
    };
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, header::HeaderValue::from_static("/settings")),
            (header::SET_COOKIE, set_flash_cookie(&message)),
        ],
    )
        .into_response()
}

/// Settings page
#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Settings page", content_type = "text/html"),
        (status = 303, description = "Not signed in; redirect to login"),
    ),
    tag = "settings"
)]
pub async fn settings_page(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
) -> Response {
    let thresholds = store::load_thresholds(&state.db).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load thresholds, using defaults");
        ThresholdSet::default()
    });
    let interval = store::logging_interval(&state.db).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load logging interval, using default");
        DEFAULT_LOGGING_INTERVAL_MINUTES
    });

    let flash = read_flash(&headers);
    let page = Html(views::settings_page(&ctx, &thresholds, interval, flash.as_deref()));
    if flash.is_some() {
        ([(header::SET_COOKIE, clear_flash_cookie())], page).into_response()
    } else {
        page.into_response()
    }
}

/// Update the threshold band of one sensor type
#[utoipa::path(
    post,
    path = "/settings/thresholds",
    request_body(content = ThresholdForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the settings page with the outcome"),
    ),
    tag = "settings"
)]
pub async fn update_threshold(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<ThresholdForm>,
) -> Response {
    let outcome = async {
        require_manager(&ctx)?;
        let sensor_type = SensorType::parse(&form.sensor_type).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown sensor type '{}'", form.sensor_type))
        })?;
        let min = parse_number("Minimum", &form.min)?;
        let max = parse_number("Maximum", &form.max)?;
        let threshold =
            Threshold::new(min, max).map_err(|e| AppError::BadRequest(e.to_string()))?;

        store::save_threshold(&state.db, sensor_type, threshold).await?;
        tracing::info!(user_id = %ctx.user_id, sensor_type = %sensor_type, "Threshold changed");
        Ok::<_, AppError>(format!("{} thresholds updated", sensor_type.label()))
    }
    .await;

    back_to_settings(outcome)
}

/// Update the sensor logging interval
#[utoipa::path(
    post,
    path = "/settings/logging-interval",
    request_body(content = LoggingIntervalForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the settings page with the outcome"),
    ),
    tag = "settings"
)]
pub async fn update_logging_interval(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<LoggingIntervalForm>,
) -> Response {
    let outcome = async {
        require_manager(&ctx)?;
        let minutes = parse_number("Logging interval", &form.minutes)?;
        store::set_logging_interval(&state.db, minutes).await?;
        tracing::info!(user_id = %ctx.user_id, minutes, "Logging interval changed");
        Ok::<_, AppError>(format!("Logging interval set to {minutes} minutes"))
    }
    .await;

    back_to_settings(outcome)
}
