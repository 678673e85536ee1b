//! Export validation, row caps, CSV layout and the print document.
//!
//! Run with: cargo test --test export_test

use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use std::collections::BTreeMap;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use farm_monitor::context::RequestContext;
use farm_monitor::domain::{DateRange, ExportFormat, ReportKind, Role};
use farm_monitor::export::csv::{write_csv, PEST_HEADERS, SENSOR_HEADERS};
use farm_monitor::export::{
    filename, prepare, run, validate, ExportError, ExportQuota, ExportRequest,
    MAX_EXPORT_SPAN_DAYS,
};
use farm_monitor::reports::{build_report, PestAlertRow, Report, ReportRows, SensorDayRow};
use farm_monitor::views::print_document;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ctx(role: Role) -> RequestContext {
    RequestContext {
        user_id: "42".to_string(),
        username: "maria".to_string(),
        role,
    }
}

fn request(format: ExportFormat, range: DateRange) -> ExportRequest {
    ExportRequest {
        kind: ReportKind::Sensor,
        range,
        format,
        inline: false,
    }
}

fn june() -> DateRange {
    DateRange::new(date(2024, 6, 1), date(2024, 6, 10))
}

fn sensor_rows(n: usize) -> Vec<SensorDayRow> {
    let sensor = Uuid::new_v4();
    (0..n)
        .map(|i| SensorDayRow {
            day: date(2024, 6, 1 + (i % 10) as u32),
            sensor_id: sensor,
            sensor_name: "North bed".to_string(),
            sensor_type: "temperature".to_string(),
            location: Some("Greenhouse A".to_string()),
            avg_value: 24.5,
            min_value: 21.0,
            max_value: 29.25,
            reading_count: 24,
            unit: Some("°C".to_string()),
        })
        .collect()
}

fn sensor_report(n: usize) -> Report {
    build_report(ReportKind::Sensor, june(), ReportRows::Sensor(sensor_rows(n)))
}

fn pest_report(pest_type: &str, description: &str) -> Report {
    let row = PestAlertRow {
        id: Uuid::new_v4(),
        pest_type: pest_type.to_string(),
        location: Some("Field 3".to_string()),
        severity: "critical".to_string(),
        status: "new".to_string(),
        confidence_score: Some(87.5),
        description: Some(description.to_string()),
        suggested_actions: None,
        detected_at: Utc.with_ymd_and_hms(2024, 6, 4, 7, 15, 0).unwrap(),
        is_read: false,
        type_count: 1,
        severity_count: 1,
    };
    build_report(ReportKind::Pest, june(), ReportRows::Pest(vec![row]))
}

fn generated_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 11, 8, 5, 9).unwrap()
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn students_cannot_export_print_documents() {
    let result = validate(&ctx(Role::Student), &request(ExportFormat::Pdf, june()));
    let err = assert_err!(result);
    assert!(matches!(err, ExportError::FormatNotAllowed));
    assert_eq!(err.to_string(), "Students can only export CSV format.");

    assert_ok!(validate(&ctx(Role::Student), &request(ExportFormat::Csv, june())));
    assert_ok!(validate(&ctx(Role::Farmer), &request(ExportFormat::Pdf, june())));
    assert_ok!(validate(&ctx(Role::Admin), &request(ExportFormat::Pdf, june())));
}

#[test]
fn ranges_longer_than_a_year_are_rejected() {
    let longest = DateRange::new(date(2024, 1, 1), date(2024, 12, 31));
    assert_eq!(longest.span_days(), MAX_EXPORT_SPAN_DAYS);
    assert_ok!(validate(&ctx(Role::Admin), &request(ExportFormat::Csv, longest)));

    let too_long = DateRange::new(date(2024, 1, 1), date(2025, 1, 1));
    let err = assert_err!(validate(
        &ctx(Role::Admin),
        &request(ExportFormat::Csv, too_long)
    ));
    assert!(matches!(err, ExportError::RangeTooLong(367)));
}

// =============================================================================
// Row caps
// =============================================================================

#[test]
fn student_export_is_capped_at_ten_thousand_rows() {
    let doc = prepare(
        &ctx(Role::Student),
        &request(ExportFormat::Csv, june()),
        sensor_report(60_000),
        generated_at(),
    )
    .unwrap();

    assert_eq!(doc.report.rows.len(), 10_000);
    assert!(doc.truncated);
    assert_eq!(doc.row_cap, 10_000);
    // Summary describes the exported rows, not the fetched ones
    assert_eq!(doc.report.summary.total_readings, 10_000 * 24);
    assert_eq!(doc.generated_by, "maria");
}

#[test]
fn admin_export_is_capped_at_fifty_thousand_rows() {
    let doc = prepare(
        &ctx(Role::Admin),
        &request(ExportFormat::Csv, june()),
        sensor_report(60_000),
        generated_at(),
    )
    .unwrap();
    assert_eq!(doc.report.rows.len(), 50_000);
    assert!(doc.truncated);

    let small = prepare(
        &ctx(Role::Admin),
        &request(ExportFormat::Csv, june()),
        sensor_report(12),
        generated_at(),
    )
    .unwrap();
    assert_eq!(small.report.rows.len(), 12);
    assert!(!small.truncated);
}

#[test]
fn empty_report_cannot_be_exported() {
    let err = assert_err!(prepare(
        &ctx(Role::Farmer),
        &request(ExportFormat::Csv, june()),
        Report::empty(ReportKind::Sensor, june()),
        generated_at(),
    ));
    assert!(matches!(err, ExportError::NoData { .. }));
    assert!(
        err.to_string()
            .starts_with("No data found for the selected date range (2024-06-01 to 2024-06-10)"),
        "{err}"
    );
}

#[test]
fn filename_carries_kind_range_and_timestamp() {
    assert_eq!(
        filename(ReportKind::Pest, &june(), ExportFormat::Csv, generated_at()),
        "farm_report_pest_2024-06-01_to_2024-06-10_2024-06-11_08-05-09.csv"
    );
    assert_eq!(
        filename(ReportKind::Sensor, &june(), ExportFormat::Pdf, generated_at()),
        "farm_report_sensor_2024-06-01_to_2024-06-10_2024-06-11_08-05-09.html"
    );
}

// =============================================================================
// CSV
// =============================================================================

#[test]
fn sensor_csv_has_bom_metadata_header_and_footer() {
    let doc = prepare(
        &ctx(Role::Farmer),
        &request(ExportFormat::Csv, june()),
        sensor_report(3),
        generated_at(),
    )
    .unwrap();

    let bytes = write_csv(Vec::new(), &doc).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));

    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "# IoT Farm Monitoring System Export");
    assert!(text.contains("# Report Type: Sensor"));
    assert!(text.contains("# Date Range: 2024-06-01 to 2024-06-10"));
    assert!(text.contains("# Generated: 2024-06-11 08:05:09 UTC by maria"));
    assert!(text.contains("# Total Records: 3"));
    assert!(!text.contains("# Truncated"));

    let header = SENSOR_HEADERS.join(",");
    let header_at = lines.iter().position(|l| *l == header).unwrap();
    assert_eq!(lines[header_at - 1], "", "blank line before the header");
    assert_eq!(
        lines[header_at + 1],
        "2024-06-01,North bed,Temperature,Greenhouse A,24.50,21.00,29.25,°C,24,Excellent"
    );

    assert_eq!(lines.last().copied(), Some("# Export completed successfully"));
    assert_eq!(lines[lines.len() - 2], "");
}

#[test]
fn truncated_csv_says_so() {
    let doc = prepare(
        &ctx(Role::Student),
        &request(ExportFormat::Csv, june()),
        sensor_report(10_001),
        generated_at(),
    )
    .unwrap();

    let bytes = write_csv(Vec::new(), &doc).unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("# Total Records: 10000"));
    assert!(text.contains("# Truncated: only the first 10000 rows are included"));
}

#[test]
fn pest_csv_quotes_free_text_and_adds_risk() {
    let mut req = request(ExportFormat::Csv, june());
    req.kind = ReportKind::Pest;
    let doc = prepare(
        &ctx(Role::Farmer),
        &req,
        pest_report("aphid", "Clusters on leaves, stems"),
        generated_at(),
    )
    .unwrap();

    let bytes = write_csv(Vec::new(), &doc).unwrap();
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.contains(&PEST_HEADERS.join(",")));
    assert!(
        text.contains(
            "2024-06-04,aphid,Field 3,Critical,New,87.50,\"Clusters on leaves, stems\",07:15:00,Very High"
        ),
        "{text}"
    );
}

// =============================================================================
// Print document
// =============================================================================

#[test]
fn print_document_escapes_user_text() {
    let mut req = request(ExportFormat::Pdf, june());
    req.kind = ReportKind::Pest;
    let doc = prepare(
        &ctx(Role::Admin),
        &req,
        pest_report("<script>alert(1)</script>", "ok"),
        generated_at(),
    )
    .unwrap();

    let html = print_document(&doc);

    assert!(html.contains("Print / Save as PDF"));
    assert!(html.contains("Pest Report"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>alert(1)"));
    assert!(html.contains("Pest monitoring recorded 1 alerts"));
}

#[test]
fn print_document_shows_only_the_first_rows() {
    let doc = prepare(
        &ctx(Role::Admin),
        &request(ExportFormat::Pdf, june()),
        sensor_report(120),
        generated_at(),
    )
    .unwrap();

    let html = print_document(&doc);
    assert!(html.contains("Showing first 50 records of 120 total records"));
    assert_eq!(html.matches("<tr><td>").count(), 50);
}

// =============================================================================
// Hourly quota
// =============================================================================

fn db_with_sensor_day(result_sets: usize) -> DatabaseConnection {
    let row = || -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("day", date(2024, 6, 2).into()),
            ("sensor_id", Uuid::new_v4().into()),
            ("sensor_name", "North bed".to_string().into()),
            ("sensor_type", "temperature".to_string().into()),
            ("location", Some("Greenhouse A".to_string()).into()),
            ("avg_value", Some(24.5).into()),
            ("min_value", Some(21.0).into()),
            ("max_value", Some(28.0).into()),
            ("reading_count", 24i64.into()),
            ("unit", Some("°C".to_string()).into()),
        ])
    };
    (0..result_sets)
        .fold(MockDatabase::new(DatabaseBackend::Postgres), |mock, _| {
            mock.append_query_results([vec![row()]])
        })
        .into_connection()
}

#[test]
fn quota_is_counted_per_user() {
    let quota = ExportQuota::per_hour(2);
    assert_eq!(quota.per_hour_limit(), 2);

    assert!(quota.try_acquire("42"));
    assert!(quota.try_acquire("42"));
    assert!(!quota.try_acquire("42"));

    assert!(quota.try_acquire("7"), "other users keep their allowance");
}

#[test]
fn zero_quota_still_allows_one_export() {
    let quota = ExportQuota::per_hour(0);
    assert_eq!(quota.per_hour_limit(), 1);
    assert!(quota.try_acquire("42"));
    assert!(!quota.try_acquire("42"));
}

#[tokio::test]
async fn export_beyond_hourly_quota_is_refused() {
    let db = db_with_sensor_day(2);
    let quota = ExportQuota::per_hour(1);
    let req = request(ExportFormat::Csv, june());

    let first = assert_ok!(run(&db, &quota, &ctx(Role::Farmer), &req).await);
    assert_eq!(first.report.rows.len(), 1);

    let err = assert_err!(run(&db, &quota, &ctx(Role::Farmer), &req).await);
    assert!(matches!(err, ExportError::QuotaExceeded(1)));
    assert_eq!(
        err.to_string(),
        "Export rate limit exceeded. Please try again later."
    );
}

#[tokio::test]
async fn refused_exports_do_not_use_the_quota() {
    // One result set for the single export that reaches the database
    let db = db_with_sensor_day(1);
    let quota = ExportQuota::per_hour(1);

    let pdf = request(ExportFormat::Pdf, june());
    let err = assert_err!(run(&db, &quota, &ctx(Role::Student), &pdf).await);
    assert!(matches!(err, ExportError::FormatNotAllowed));

    let csv = request(ExportFormat::Csv, june());
    assert_ok!(run(&db, &quota, &ctx(Role::Student), &csv).await);
}
