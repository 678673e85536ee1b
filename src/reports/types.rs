use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AlertStatus, DateRange, ReportKind, SensorType, Severity};

/// Readings of one sensor on one day, reduced to avg/min/max/count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDayRow {
    pub day: NaiveDate,
    pub sensor_id: Uuid,
    pub sensor_name: String,
    pub sensor_type: String,
    pub location: Option<String>,
    pub avg_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub reading_count: i64,
    pub unit: Option<String>,
}

impl SensorDayRow {
    #[must_use]
    pub fn sensor_kind(&self) -> Option<SensorType> {
        SensorType::parse(&self.sensor_type)
    }
}

/// One pest alert, annotated with the size of its pest-type and severity partitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PestAlertRow {
    pub id: Uuid,
    pub pest_type: String,
    pub location: Option<String>,
    pub severity: String,
    pub status: String,
    pub confidence_score: Option<f64>,
    pub description: Option<String>,
    pub suggested_actions: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub is_read: bool,
    /// Alerts in the report range sharing this pest type.
    pub type_count: i64,
    /// Alerts in the report range sharing this severity.
    pub severity_count: i64,
}

impl PestAlertRow {
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.detected_at.date_naive()
    }

    #[must_use]
    pub fn severity_level(&self) -> Option<Severity> {
        Severity::parse(&self.severity)
    }

    #[must_use]
    pub fn alert_status(&self) -> Option<AlertStatus> {
        AlertStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum ReportRows {
    Sensor(Vec<SensorDayRow>),
    Pest(Vec<PestAlertRow>),
}

impl ReportRows {
    #[must_use]
    pub fn empty(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Sensor => Self::Sensor(Vec::new()),
            ReportKind::Pest => Self::Pest(Vec::new()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Sensor(rows) => rows.len(),
            Self::Pest(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep at most `cap` rows. Returns `true` when rows were dropped.
    pub fn truncate(&mut self, cap: usize) -> bool {
        let before = self.len();
        match self {
            Self::Sensor(rows) => rows.truncate(cap),
            Self::Pest(rows) => rows.truncate(cap),
        }
        self.len() < before
    }
}

/// Derived, non-persisted statistics for a report.
///
/// Sensor reports fill the sensor counters, pest reports the alert counters;
/// the other group stays zero. `span_days` is always set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub span_days: i64,
    // Sensor mode
    pub total_sensors: i64,
    pub total_readings: i64,
    pub active_days: i64,
    // Pest mode
    pub total_alerts: i64,
    pub critical_alerts: i64,
    pub high_alerts: i64,
    pub resolved_alerts: i64,
    pub new_alerts: i64,
    pub unique_pests: i64,
    pub avg_confidence: Option<f64>,
}

/// Columnar chart data: every dataset has one value per label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Ascending dates
    pub labels: Vec<NaiveDate>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub name: String,
    pub unit: Option<String>,
    /// Same length as `labels`, null where the day has no data
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub range: DateRange,
    pub rows: ReportRows,
    pub summary: ReportSummary,
    pub chart: ChartSeries,
}

impl Report {
    /// Well-formed report with no data, used when a query fails.
    #[must_use]
    pub fn empty(kind: ReportKind, range: DateRange) -> Self {
        Self {
            kind,
            range,
            rows: ReportRows::empty(kind),
            summary: ReportSummary {
                span_days: range.span_days(),
                ..ReportSummary::default()
            },
            chart: ChartSeries::default(),
        }
    }
}
