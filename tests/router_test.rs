//! HTTP behaviour of the router against a mock database.
//!
//! Run with: cargo test --test router_test

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use std::collections::BTreeMap;
use tower::ServiceExt;
use tower_governor::key_extractor::KeyExtractor;
use uuid::Uuid;

use farm_monitor::bridge::BridgeClient;
use farm_monitor::common::AppState;
use farm_monitor::config::Config;
use farm_monitor::entity::{pest_alerts, user_settings};
use farm_monitor::domain::DateRange;
use farm_monitor::routes::reports::ReportQuery;
use farm_monitor::routes::{build_router, rate_limit::UserOrIpKeyExtractor};

type Row = BTreeMap<&'static str, Value>;

fn app(db: DatabaseConnection) -> Router {
    let config = Config::for_database("postgres://localhost/farm_monitor_test");
    let client = BridgeClient::new(&config).unwrap();
    build_router(AppState::new(db, config, client))
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn db_with_sensor_rows(rows: Vec<Row>) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([rows])
        .into_connection()
}

fn sensor_row(day: &str) -> Row {
    BTreeMap::from([
        ("day", chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap().into()),
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
}

fn get(uri: &str, role: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(role) = role {
        builder = builder
            .header("x-user-id", "42")
            .header("x-user-name", "maria")
            .header("x-user-role", role);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, role: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", "42")
        .header("x-user-name", "maria")
        .header("x-user-role", role)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn header_str<'a>(response: &'a axum::response::Response, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[tokio::test]
async fn healthz_is_public() {
    let response = app(empty_db()).oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn root_redirects_to_reports() {
    let response = app(empty_db()).oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&response, header::LOCATION), "/reports");
}

#[tokio::test]
async fn anonymous_requests_go_to_login() {
    for uri in ["/reports", "/sensors", "/settings", "/api/sensors/live"] {
        let response = app(empty_db()).oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(header_str(&response, header::LOCATION), "/login", "{uri}");
    }
}

#[tokio::test]
async fn report_page_renders_rows_and_role_gated_export_links() {
    let db = db_with_sensor_rows(vec![sensor_row("2024-06-02")]);
    let response = app(db)
        .oneshot(get(
            "/reports?report_type=sensor&start_date=2024-06-01&end_date=2024-06-10",
            Some("student"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Sensor Report"));
    assert!(html.contains("North bed"));
    assert!(html.contains("export-csv"));
    assert!(!html.contains("export-pdf"));
}

#[tokio::test]
async fn report_page_survives_database_failure() {
    // No query results queued: the mock answers with an error
    let response = app(empty_db())
        .oneshot(get("/reports?report_type=pest", Some("admin")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Pest Report"));
}

#[tokio::test]
async fn student_pdf_export_redirects_with_flash() {
    let response = app(empty_db())
        .oneshot(get(
            "/reports?report_type=sensor&start_date=2024-06-01&end_date=2024-06-10&export=pdf",
            Some("student"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = header_str(&response, header::LOCATION);
    assert_eq!(
        location,
        "/reports?report_type=sensor&start_date=2024-06-01&end_date=2024-06-10"
    );
    assert!(!location.contains("export"));

    let cookie = header_str(&response, header::SET_COOKIE);
    assert!(
        cookie.starts_with("flash=Export%20failed%3A%20Students%20can%20only%20export%20CSV"),
        "{cookie}"
    );
}

#[tokio::test]
async fn empty_export_redirects_to_ordered_range() {
    let db = db_with_sensor_rows(Vec::new());
    let response = app(db)
        .oneshot(get(
            "/reports?report_type=sensor&start_date=2024-06-10&end_date=2024-06-01&export=csv",
            Some("farmer"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        header_str(&response, header::LOCATION),
        "/reports?report_type=sensor&start_date=2024-06-01&end_date=2024-06-10"
    );
    assert!(header_str(&response, header::SET_COOKIE).contains("No%20data%20found"));
}

#[tokio::test]
async fn csv_export_is_an_attachment() {
    let db = db_with_sensor_rows(vec![sensor_row("2024-06-02"), sensor_row("2024-06-01")]);
    let response = app(db)
        .oneshot(get(
            "/reports?report_type=sensor&start_date=2024-06-01&end_date=2024-06-10&export=csv",
            Some("student"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        "text/csv; charset=utf-8"
    );
    assert!(header_str(&response, header::CONTENT_DISPOSITION)
        .starts_with("attachment; filename=\"farm_report_sensor_2024-06-01_to_2024-06-10_"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("# Total Records: 2"));
    assert!(text.trim_end().ends_with("# Export completed successfully"));
}

#[tokio::test]
async fn fifty_first_export_in_an_hour_redirects() {
    let mock = (0..51).fold(MockDatabase::new(DatabaseBackend::Postgres), |mock, _| {
        mock.append_query_results([vec![sensor_row("2024-06-02")]])
    });
    let app = app(mock.into_connection());
    let uri = "/reports?report_type=sensor&start_date=2024-06-01&end_date=2024-06-10&export=csv";

    for i in 0..50 {
        let response = app.clone().oneshot(get(uri, Some("farmer"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "export {}", i + 1);
    }

    let response = app.oneshot(get(uri, Some("farmer"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(
        header_str(&response, header::SET_COOKIE).contains("Export%20rate%20limit%20exceeded"),
        "{}",
        header_str(&response, header::SET_COOKIE)
    );
}

#[tokio::test]
async fn pest_page_shows_confidence_as_percentage() {
    let alert = pest_alerts::Model {
        id: Uuid::new_v4(),
        pest_type: "aphid".to_string(),
        location: Some("Field 3".to_string()),
        severity: "high".to_string(),
        status: "new".to_string(),
        confidence_score: Some(87.5),
        description: None,
        suggested_actions: None,
        image_path: None,
        is_read: Some(false),
        detected_at: chrono::DateTime::parse_from_rfc3339("2024-06-04T07:15:00+00:00").unwrap(),
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![alert]])
        .into_connection();

    let response = app(db)
        .oneshot(get(
            "/reports?report_type=pest&start_date=2024-06-01&end_date=2024-06-10",
            Some("farmer"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("87.5%"), "{html}");
    assert!(!html.contains("0.9%"));
}

#[tokio::test]
async fn inline_print_document_for_farmers() {
    let db = db_with_sensor_rows(vec![sensor_row("2024-06-02")]);
    let response = app(db)
        .oneshot(get(
            "/reports?start_date=2024-06-01&end_date=2024-06-10&export=pdf&inline=1",
            Some("farmer"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, header::CONTENT_DISPOSITION).starts_with("inline;"));
    assert!(body_text(response).await.contains("Print / Save as PDF"));
}

#[tokio::test]
async fn flash_is_shown_once() {
    let request = Request::builder()
        .uri("/reports?start_date=2024-06-01&end_date=2024-06-10")
        .header("x-user-id", "42")
        .header("x-user-name", "maria")
        .header("x-user-role", "admin")
        .header(header::COOKIE, "flash=Export%20failed%3A%20boom")
        .body(Body::empty())
        .unwrap();

    let response = app(db_with_sensor_rows(Vec::new()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, header::SET_COOKIE).contains("Max-Age=0"));
    assert!(body_text(response).await.contains("Export failed: boom"));
}

#[tokio::test]
async fn students_cannot_change_thresholds() {
    let response = app(empty_db())
        .oneshot(post_form(
            "/settings/thresholds",
            "student",
            "sensor_type=temperature&min=18&max=30",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&response, header::LOCATION), "/settings");
    assert!(header_str(&response, header::SET_COOKIE).contains("cannot%20change%20settings"));
}

#[tokio::test]
async fn inverted_threshold_is_rejected() {
    let response = app(empty_db())
        .oneshot(post_form(
            "/settings/thresholds",
            "farmer",
            "sensor_type=temperature&min=30&max=20",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(header_str(&response, header::SET_COOKIE)
        .contains("minimum%20must%20be%20lower%20than%20maximum"));
}

#[tokio::test]
async fn settings_page_is_read_only_for_students() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user_settings::Model>::new()])
        .append_query_results([Vec::<user_settings::Model>::new()])
        .into_connection();

    let response = app(db).oneshot(get("/settings", Some("student"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(" disabled"));
}

#[test]
fn missing_dates_default_to_configured_days_before_end() {
    let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let date = |s: &str| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

    let range = ReportQuery::default().range(today, 30);
    assert_eq!(range, DateRange::new(date("2024-05-31"), today));

    let query = ReportQuery {
        start_date: Some("not-a-date".to_string()),
        end_date: Some("2024-06-10".to_string()),
        ..ReportQuery::default()
    };
    assert_eq!(query.range(today, 7), DateRange::new(date("2024-06-03"), date("2024-06-10")));
}

#[test]
fn rate_limit_key_prefers_user_over_ip() {
    let extractor = UserOrIpKeyExtractor;

    let with_user = Request::builder()
        .header("x-user-id", "42")
        .header("x-forwarded-for", "203.0.113.9")
        .body(())
        .unwrap();
    assert_eq!(extractor.extract(&with_user).unwrap(), "user:42");

    let forwarded = Request::builder()
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .body(())
        .unwrap();
    assert_eq!(extractor.extract(&forwarded).unwrap(), "ip:203.0.113.9");

    let anonymous = Request::builder().body(()).unwrap();
    assert_eq!(extractor.extract(&anonymous).unwrap(), "ip:127.0.0.1");
}
