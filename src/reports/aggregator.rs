use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Statement, Value,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use crate::domain::{AlertStatus, DateRange, ReportKind, Severity};
use crate::entity::pest_alerts;
use crate::error::AppResult;

use super::types::{
    ChartDataset, ChartSeries, PestAlertRow, Report, ReportRows, ReportSummary, SensorDayRow,
};

/// Minimal struct for the per-sensor, per-day aggregate query
#[derive(Debug, FromQueryResult)]
struct SensorDayQueryRow {
    day: NaiveDate,
    sensor_id: Uuid,
    sensor_name: String,
    sensor_type: String,
    location: Option<String>,
    avg_value: Option<f64>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    reading_count: i64,
    unit: Option<String>,
}

/// UTC instants bounding a date range: `[start 00:00, end + 1 day 00:00)`.
#[must_use]
pub fn range_bounds(range: &DateRange) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = range.start.and_time(NaiveTime::MIN).and_utc();
    let end = (range.end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
    (start, end)
}

/// Aggregate a report of the given kind over an inclusive date range.
///
/// Days are UTC calendar days.
///
/// # Errors
///
/// Returns `AppError::Database` if the underlying query fails.
pub async fn aggregate(
    db: &DatabaseConnection,
    kind: ReportKind,
    range: DateRange,
) -> AppResult<Report> {
    aggregate_capped(db, kind, range, None).await
}

/// [`aggregate`] with at most `limit` rows fetched from the database.
///
/// # Errors
///
/// Returns `AppError::Database` if the underlying query fails or a row
/// cannot be decoded.
pub async fn aggregate_capped(
    db: &DatabaseConnection,
    kind: ReportKind,
    range: DateRange,
    limit: Option<usize>,
) -> AppResult<Report> {
    let rows = match kind {
        ReportKind::Sensor => ReportRows::Sensor(fetch_sensor_rows(db, &range, limit).await?),
        ReportKind::Pest => ReportRows::Pest(fetch_pest_rows(db, &range, limit).await?),
    };

    tracing::debug!(
        kind = %kind,
        start = %range.start,
        end = %range.end,
        limit = ?limit,
        rows = rows.len(),
        "report_aggregated"
    );

    Ok(build_report(kind, range, rows))
}

/// Like [`aggregate`], but a failed query is logged and yields an empty report.
pub async fn aggregate_or_empty(
    db: &DatabaseConnection,
    kind: ReportKind,
    range: DateRange,
) -> Report {
    match aggregate(db, kind, range).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(
                error = %e,
                kind = %kind,
                start = %range.start,
                end = %range.end,
                "Report aggregation failed, rendering empty report"
            );
            Report::empty(kind, range)
        }
    }
}

/// Assemble a report from already fetched rows.
#[must_use]
pub fn build_report(kind: ReportKind, range: DateRange, rows: ReportRows) -> Report {
    let (summary, chart) = match &rows {
        ReportRows::Sensor(r) => (summarize_sensor_rows(r, &range), sensor_chart(r)),
        ReportRows::Pest(r) => (summarize_pest_rows(r, &range), pest_chart(r)),
    };

    Report {
        kind,
        range,
        rows,
        summary,
        chart,
    }
}

/// Per-sensor, per-day aggregates, most recent day first, then by type and name.
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails or a row does not decode.
pub async fn fetch_sensor_rows(
    db: &DatabaseConnection,
    range: &DateRange,
    limit: Option<usize>,
) -> AppResult<Vec<SensorDayRow>> {
    let (start, end) = range_bounds(range);

    let mut sql = String::from(
        r"
        SELECT
            (sr.recorded_at AT TIME ZONE 'UTC')::date AS day,
            s.id AS sensor_id,
            s.sensor_name,
            s.sensor_type,
            s.location,
            AVG(sr.value) AS avg_value,
            MIN(sr.value) AS min_value,
            MAX(sr.value) AS max_value,
            COUNT(sr.id) AS reading_count,
            MAX(COALESCE(sr.unit, s.unit)) AS unit
        FROM sensors s
        JOIN sensor_readings sr ON s.id = sr.sensor_id
        WHERE sr.recorded_at >= $1
          AND sr.recorded_at < $2
        GROUP BY s.id, s.sensor_name, s.sensor_type, s.location, day
        ORDER BY day DESC, s.sensor_type ASC, s.sensor_name ASC",
    );
    let mut values: Vec<Value> = vec![start.into(), end.into()];
    if let Some(limit) = limit {
        sql.push_str("\n        LIMIT $3");
        values.push(i64::try_from(limit).unwrap_or(i64::MAX).into());
    }

    let rows = SensorDayQueryRow::find_by_statement(Statement::from_sql_and_values(
        db.get_database_backend(),
        sql,
        values,
    ))
    .all(db)
    .await?
    .into_iter()
    .map(|r| SensorDayRow {
        day: r.day,
        sensor_id: r.sensor_id,
        sensor_name: r.sensor_name,
        sensor_type: r.sensor_type,
        location: r.location,
        avg_value: r.avg_value.unwrap_or_default(),
        min_value: r.min_value.unwrap_or_default(),
        max_value: r.max_value.unwrap_or_default(),
        reading_count: r.reading_count,
        unit: r.unit,
    })
    .collect();

    Ok(rows)
}

/// Pest alerts in range, most recent first, annotated with partition counts.
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn fetch_pest_rows(
    db: &DatabaseConnection,
    range: &DateRange,
    limit: Option<usize>,
) -> AppResult<Vec<PestAlertRow>> {
    let (start, end) = range_bounds(range);

    let alerts = pest_alerts::Entity::find()
        .filter(pest_alerts::Column::DetectedAt.gte(start))
        .filter(pest_alerts::Column::DetectedAt.lt(end))
        .order_by_desc(pest_alerts::Column::DetectedAt)
        .limit(limit.and_then(|n| u64::try_from(n).ok()))
        .all(db)
        .await?;

    let mut rows: Vec<PestAlertRow> = alerts
        .into_iter()
        .map(|a| PestAlertRow {
            id: a.id,
            pest_type: a.pest_type,
            location: a.location,
            severity: a.severity,
            status: a.status,
            confidence_score: a.confidence_score,
            description: a.description,
            suggested_actions: a.suggested_actions,
            detected_at: a.detected_at.with_timezone(&Utc),
            is_read: a.is_read.unwrap_or(false),
            type_count: 0,
            severity_count: 0,
        })
        .collect();

    annotate_partition_counts(&mut rows);
    Ok(rows)
}

/// Fill `type_count` and `severity_count`, i.e. `COUNT(*) OVER (PARTITION BY ...)`.
pub fn annotate_partition_counts(rows: &mut [PestAlertRow]) {
    let mut by_type: HashMap<String, i64> = HashMap::new();
    let mut by_severity: HashMap<String, i64> = HashMap::new();

    for row in rows.iter() {
        *by_type.entry(row.pest_type.clone()).or_default() += 1;
        *by_severity.entry(row.severity.clone()).or_default() += 1;
    }

    for row in rows.iter_mut() {
        row.type_count = by_type.get(&row.pest_type).copied().unwrap_or_default();
        row.severity_count = by_severity.get(&row.severity).copied().unwrap_or_default();
    }
}

#[must_use]
pub fn summarize_sensor_rows(rows: &[SensorDayRow], range: &DateRange) -> ReportSummary {
    let sensors: HashSet<Uuid> = rows.iter().map(|r| r.sensor_id).collect();
    let days: HashSet<NaiveDate> = rows.iter().map(|r| r.day).collect();

    ReportSummary {
        span_days: range.span_days(),
        total_sensors: count(sensors.len()),
        total_readings: rows.iter().map(|r| r.reading_count).sum(),
        active_days: count(days.len()),
        ..ReportSummary::default()
    }
}

#[must_use]
pub fn summarize_pest_rows(rows: &[PestAlertRow], range: &DateRange) -> ReportSummary {
    let severity_count =
        |s: Severity| count(rows.iter().filter(|r| r.severity_level() == Some(s)).count());
    let status_count =
        |s: AlertStatus| count(rows.iter().filter(|r| r.alert_status() == Some(s)).count());
    let pests: HashSet<&str> = rows.iter().map(|r| r.pest_type.as_str()).collect();

    let confidences: Vec<f64> = rows.iter().filter_map(|r| r.confidence_score).collect();
    let avg_confidence = if confidences.is_empty() {
        None
    } else {
        Some(confidences.iter().sum::<f64>() / confidences.len() as f64)
    };

    ReportSummary {
        span_days: range.span_days(),
        total_alerts: count(rows.len()),
        critical_alerts: severity_count(Severity::Critical),
        high_alerts: severity_count(Severity::High),
        resolved_alerts: status_count(AlertStatus::Resolved),
        new_alerts: status_count(AlertStatus::New),
        unique_pests: count(pests.len()),
        avg_confidence,
        ..ReportSummary::default()
    }
}

/// Daily reading-weighted average per sensor type, ascending by date.
#[must_use]
pub fn sensor_chart(rows: &[SensorDayRow]) -> ChartSeries {
    let labels: Vec<NaiveDate> = rows
        .iter()
        .map(|r| r.day)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: HashMap<NaiveDate, usize> =
        labels.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    // (weighted sum, reading count) per label, keyed by type sort key
    let mut sums: BTreeMap<(u8, String), (Option<String>, Vec<(f64, i64)>)> = BTreeMap::new();

    for row in rows {
        let key = match row.sensor_kind() {
            Some(t) => (t as u8, t.label().to_string()),
            None => (u8::MAX, row.sensor_type.clone()),
        };
        let entry = sums
            .entry(key)
            .or_insert_with(|| (row.unit.clone(), vec![(0.0, 0); labels.len()]));
        if let Some(&i) = index.get(&row.day) {
            entry.1[i].0 += row.avg_value * row.reading_count as f64;
            entry.1[i].1 += row.reading_count;
        }
    }

    let datasets = sums
        .into_iter()
        .map(|((_, name), (unit, cells))| ChartDataset {
            name,
            unit,
            values: cells
                .into_iter()
                .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
                .collect(),
        })
        .collect();

    ChartSeries { labels, datasets }
}

/// Daily alert count per severity, ascending by date.
#[must_use]
pub fn pest_chart(rows: &[PestAlertRow]) -> ChartSeries {
    let labels: Vec<NaiveDate> = rows
        .iter()
        .map(PestAlertRow::day)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: HashMap<NaiveDate, usize> =
        labels.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut counts: BTreeMap<Severity, Vec<i64>> = BTreeMap::new();
    for row in rows {
        let Some(severity) = row.severity_level() else {
            continue;
        };
        let cells = counts
            .entry(severity)
            .or_insert_with(|| vec![0; labels.len()]);
        if let Some(&i) = index.get(&row.day()) {
            cells[i] += 1;
        }
    }

    let datasets = counts
        .into_iter()
        .map(|(severity, cells)| ChartDataset {
            name: severity.as_str().to_string(),
            unit: None,
            values: cells.into_iter().map(|c| Some(c as f64)).collect(),
        })
        .collect();

    ChartSeries { labels, datasets }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

