use axum::{
    extract::{Query, State},
    http::{
        header::{self, HeaderMap, HeaderValue},
        StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::common::AppState;
use crate::context::{clear_flash_cookie, read_flash, set_flash_cookie, RequestContext};
use crate::domain::{DateRange, ExportFormat, ReportKind};
use crate::error::{AppError, AppResult};
use crate::export::{self, csv::stream_csv, ExportDocument, ExportRequest};
use crate::reports::aggregate_or_empty;
use crate::views::{self, reports::report_href};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// `sensor` (default) or `pest`
    pub report_type: Option<String>,
    /// ISO date, defaults to the configured number of days before `end_date`
    pub start_date: Option<String>,
    /// ISO date, defaults to today (UTC)
    pub end_date: Option<String>,
    /// `csv` or `pdf`; turns the request into an export
    pub export: Option<String>,
    /// `1` serves the print document inline
    pub inline: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

impl ReportQuery {
    /// Unknown report types fall back to the sensor report.
    #[must_use]
    pub fn kind(&self) -> ReportKind {
        match self.report_type.as_deref().map(str::trim) {
            Some("pest") => ReportKind::Pest,
            _ => ReportKind::Sensor,
        }
    }

    /// Requested range. Missing or malformed dates take defaults; an inverted
    /// pair is swapped.
    #[must_use]
    pub fn range(&self, today: NaiveDate, default_days: i64) -> DateRange {
        let end = parse_date(self.end_date.as_deref()).unwrap_or(today);
        let start = parse_date(self.start_date.as_deref())
            .unwrap_or_else(|| end - Duration::days(default_days.max(0)));
        DateRange::new(start, end)
    }

    #[must_use]
    pub fn export_format(&self) -> Option<ExportFormat> {
        match self.export.as_deref().map(str::trim) {
            Some("csv") => Some(ExportFormat::Csv),
            Some("pdf") => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    #[must_use]
    pub fn inline(&self) -> bool {
        matches!(self.inline.as_deref().map(str::trim), Some("1" | "true"))
    }
}

/// Report page, or an export when `export` is set
///
/// Exports are terminal: the response is either the file or a redirect back to
/// the report page (without `export`) carrying a flash message.
#[utoipa::path(
    get,
    path = "/reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Report page, CSV file or print document"),
        (status = 303, description = "Export failed or not signed in; redirect"),
        (status = 429, description = "Too many requests"),
    ),
    tag = "reports"
)]
pub async fn reports(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Response {
    let kind = query.kind();
    let range = query.range(Utc::now().date_naive(), state.config.default_report_days);

    if let Some(format) = query.export_format() {
        let request = ExportRequest {
            kind,
            range,
            format,
            inline: query.inline(),
        };
        return match export::run(&state.db, &state.export_quota, &ctx, &request).await {
            Ok(doc) => export_response(doc, request.inline).unwrap_or_else(|e| {
                export_failed_redirect(kind, &range, &e.user_message())
            }),
            Err(e) => export_failed_redirect(kind, &range, &e.to_string()),
        };
    }

    let flash = read_flash(&headers);
    let report = aggregate_or_empty(&state.db, kind, range).await;
    let page = views::report_page(&ctx, &report, flash.as_deref());

    if flash.is_some() {
        ([(header::SET_COOKIE, clear_flash_cookie())], Html(page)).into_response()
    } else {
        Html(page).into_response()
    }
}

/// Queue the failure message and send the user back to the report page.
#[must_use]
pub fn export_failed_redirect(kind: ReportKind, range: &DateRange, reason: &str) -> Response {
    let location = report_href(kind, range, None);
    let message = format!("Export failed: {reason}");

    let mut response = StatusCode::SEE_OTHER.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, value);
    }
    headers.insert(header::SET_COOKIE, set_flash_cookie(&message));
    response
}

fn content_disposition(filename: &str, inline: bool) -> AppResult<HeaderValue> {
    let disposition = if inline { "inline" } else { "attachment" };
    HeaderValue::from_str(&format!("{disposition}; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn export_response(doc: ExportDocument, inline: bool) -> AppResult<Response> {
    let filename = doc.filename();

    match doc.format {
        ExportFormat::Csv => Response::builder()
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            )
            .header(header::CONTENT_DISPOSITION, content_disposition(&filename, false)?)
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, must-revalidate"))
            .body(stream_csv(doc))
            .map_err(|e| AppError::Internal(e.to_string())),
        ExportFormat::Pdf => {
            let html = views::print_document(&doc);
            Response::builder()
                .header(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                )
                .header(header::CONTENT_DISPOSITION, content_disposition(&filename, inline)?)
                .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, must-revalidate"))
                .body(axum::body::Body::from(html))
                .map_err(|e| AppError::Internal(e.to_string()))
        }
    }
}
