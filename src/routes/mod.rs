pub mod health;
pub mod rate_limit;
pub mod reports;
pub mod sensors;
pub mod settings;

use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use rate_limit::UserOrIpKeyExtractor;

use crate::common::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        reports::reports,
        sensors::sensors_page,
        sensors::live_readings,
        sensors::history,
        settings::settings_page,
        settings::update_threshold,
        settings::update_logging_interval,
    ),
    components(
        schemas(
            health::HealthResponse,
            settings::ThresholdForm,
            settings::LoggingIntervalForm,
            crate::bridge::LiveView,
            crate::bridge::LiveStatus,
            crate::bridge::LiveEvaluation,
            crate::bridge::HistoricalEntry,
            crate::evaluation::Evaluation,
            crate::evaluation::StatusTier,
            crate::domain::SensorType,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "reports", description = "Sensor and pest reports, CSV and print exports"),
        (name = "sensors", description = "Live and persisted sensor readings"),
        (name = "settings", description = "Threshold bands and logging interval"),
    ),
    info(
        title = "Farm Monitor",
        description = "IoT farm monitoring dashboard: threshold evaluation, reports and exports",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    // Report and export routes are the expensive ones
    let report_routes_base = Router::new().route("/reports", get(reports::reports));

    let report_routes = if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
        report_routes_base
    } else {
        let limiter = GovernorConfigBuilder::default()
            .key_extractor(UserOrIpKeyExtractor)
            .per_second(config.rate_limit_reports_per_second)
            .burst_size(config.rate_limit_reports_burst)
            .finish();

        match limiter {
            Some(limiter) => {
                tracing::info!(
                    reports_rate = %format!(
                        "{}/s burst {}",
                        config.rate_limit_reports_per_second, config.rate_limit_reports_burst
                    ),
                    "Rate limiting configured"
                );
                report_routes_base.layer(GovernorLayer {
                    config: Arc::new(limiter),
                })
            }
            None => {
                tracing::error!(
                    per_second = config.rate_limit_reports_per_second,
                    burst = config.rate_limit_reports_burst,
                    "Invalid rate limit configuration, report routes are NOT rate limited"
                );
                report_routes_base
            }
        }
    };

    let page_routes = Router::new()
        .route("/", get(|| async { Redirect::to("/reports") }))
        .route("/sensors", get(sensors::sensors_page))
        .route("/settings", get(settings::settings_page))
        .route("/settings/thresholds", post(settings::update_threshold))
        .route(
            "/settings/logging-interval",
            post(settings::update_logging_interval),
        )
        .merge(report_routes)
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // forms only

    let api_routes = Router::new()
        .route("/sensors/live", get(sensors::live_readings))
        .route("/sensors/history", get(sensors::history));

    // Health check routes (NO rate limiting)
    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .merge(page_routes)
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
