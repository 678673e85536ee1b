//! Report export as CSV or a print-ready document.
//!
//! An export reuses the report rows, capped per role. Every attempt is written
//! to the `audit` log target whether it succeeds or not.

pub mod csv;
pub mod quota;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::context::RequestContext;
use crate::domain::{DateRange, ExportFormat, ReportKind};
use crate::error::AppError;
use crate::reports::{aggregate_capped, build_report, Report};

pub use quota::ExportQuota;

/// Longest exportable range, both bounds included.
pub const MAX_EXPORT_SPAN_DAYS: i64 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub kind: ReportKind,
    pub range: DateRange,
    pub format: ExportFormat,
    /// Serve the print document inline instead of as an attachment
    pub inline: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Students can only export CSV format.")]
    FormatNotAllowed,

    #[error("Date range cannot exceed {MAX_EXPORT_SPAN_DAYS} days (requested {0}).")]
    RangeTooLong(i64),

    #[error("No data found for the selected date range ({start} to {end}). Please check your date range and try again.")]
    NoData { start: String, end: String },

    /// Carries the hourly allowance that was used up
    #[error("Export rate limit exceeded. Please try again later.")]
    QuotaExceeded(u32),

    #[error("Unable to load report data.")]
    Data(#[source] AppError),

    #[error("Unable to write export file.")]
    Write(String),
}

/// Rows ready to be written, plus what the reader needs to know about them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub report: Report,
    pub format: ExportFormat,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    /// Row cap applied for the requesting role
    pub row_cap: usize,
    /// Rows were dropped to honor `row_cap`
    pub truncated: bool,
}

impl ExportDocument {
    #[must_use]
    pub fn filename(&self) -> String {
        filename(
            self.report.kind,
            &self.report.range,
            self.format,
            self.generated_at,
        )
    }
}

/// `farm_report_{kind}_{start}_to_{end}_{YYYY-mm-dd_HH-MM-SS}.{ext}`
#[must_use]
pub fn filename(
    kind: ReportKind,
    range: &DateRange,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> String {
    format!(
        "farm_report_{kind}_{}_to_{}_{}.{}",
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d"),
        generated_at.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Reject requests the caller may not make. Inverted ranges were already
/// swapped when the `DateRange` was built.
///
/// # Errors
///
/// Returns `ExportError::FormatNotAllowed` or `ExportError::RangeTooLong`.
pub fn validate(ctx: &RequestContext, request: &ExportRequest) -> Result<(), ExportError> {
    if !ctx.role.can_export(request.format) {
        return Err(ExportError::FormatNotAllowed);
    }
    let span = request.range.span_days();
    if span > MAX_EXPORT_SPAN_DAYS {
        return Err(ExportError::RangeTooLong(span));
    }
    Ok(())
}

/// Apply the role's row cap to an aggregated report. Summary and chart are
/// recomputed over the rows that remain.
///
/// # Errors
///
/// Returns `ExportError::NoData` when the report has no rows.
pub fn prepare(
    ctx: &RequestContext,
    request: &ExportRequest,
    report: Report,
    generated_at: DateTime<Utc>,
) -> Result<ExportDocument, ExportError> {
    if report.rows.is_empty() {
        return Err(ExportError::NoData {
            start: request.range.start.to_string(),
            end: request.range.end.to_string(),
        });
    }

    let row_cap = ctx.role.export_row_cap();
    let Report {
        kind,
        range,
        mut rows,
        ..
    } = report;
    let total = rows.len();
    let truncated = rows.truncate(row_cap);
    if truncated {
        tracing::info!(
            user_id = %ctx.user_id,
            role = %ctx.role,
            total,
            row_cap,
            "Export truncated to role row cap"
        );
    }

    Ok(ExportDocument {
        report: build_report(kind, range, rows),
        format: request.format,
        generated_at,
        generated_by: ctx.username.clone(),
        row_cap,
        truncated,
    })
}

/// Validate, aggregate and cap, then draw from the user's export quota.
/// Audits the attempt before returning.
///
/// The row cap is pushed into the queries: one row past the cap is fetched so
/// truncation stays detectable.
///
/// # Errors
///
/// Returns an `ExportError` describing why no file can be produced.
pub async fn run(
    db: &DatabaseConnection,
    quota: &ExportQuota,
    ctx: &RequestContext,
    request: &ExportRequest,
) -> Result<ExportDocument, ExportError> {
    let result = async {
        validate(ctx, request)?;
        let fetch_limit = ctx.role.export_row_cap().saturating_add(1);
        let report = aggregate_capped(db, request.kind, request.range, Some(fetch_limit))
            .await
            .map_err(ExportError::Data)?;
        let doc = prepare(ctx, request, report, Utc::now())?;
        if quota.try_acquire(&ctx.user_id) {
            Ok::<_, ExportError>(doc)
        } else {
            Err(ExportError::QuotaExceeded(quota.per_hour_limit()))
        }
    }
    .await;

    audit(ctx, request, &result);
    result
}

/// One structured record per export attempt on the `audit` target.
pub fn audit(
    ctx: &RequestContext,
    request: &ExportRequest,
    result: &Result<ExportDocument, ExportError>,
) {
    match result {
        Ok(doc) => tracing::info!(
            target: "audit",
            user_id = %ctx.user_id,
            username = %ctx.username,
            role = %ctx.role,
            kind = %request.kind,
            format = %request.format,
            start = %request.range.start,
            end = %request.range.end,
            rows = doc.report.rows.len(),
            truncated = doc.truncated,
            success = true,
            "export"
        ),
        Err(e) => tracing::info!(
            target: "audit",
            user_id = %ctx.user_id,
            username = %ctx.username,
            role = %ctx.role,
            kind = %request.kind,
            format = %request.format,
            start = %request.range.start,
            end = %request.range.end,
            success = false,
            error = %e,
            "export"
        ),
    }

    match result {
        Err(ExportError::Data(e)) => tracing::error!(error = %e, "Export data query failed"),
        Err(ExportError::QuotaExceeded(per_hour)) => tracing::warn!(
            user_id = %ctx.user_id,
            per_hour,
            "Export quota used up"
        ),
        _ => {}
    }
}
