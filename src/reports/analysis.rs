//! Derived judgements shown alongside report rows in exports.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;

use crate::domain::{AlertStatus, Severity};

use super::types::{Report, ReportRows};

/// Readings per sensor-day considered a complete record.
pub const EXCELLENT_READINGS_PER_DAY: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl DataQuality {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade a sensor-day by how many readings it aggregates.
#[must_use]
pub const fn data_quality(reading_count: i64) -> DataQuality {
    if reading_count >= EXCELLENT_READINGS_PER_DAY {
        DataQuality::Excellent
    } else if reading_count >= 10 {
        DataQuality::Good
    } else if reading_count >= 5 {
        DataQuality::Fair
    } else {
        DataQuality::Poor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum RiskLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    Unknown,
}

impl RiskLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk of a pest alert. A resolved alert is always low risk.
#[must_use]
pub fn risk_level(severity: &str, status: &str) -> RiskLevel {
    if AlertStatus::parse(status) == Some(AlertStatus::Resolved) {
        return RiskLevel::Low;
    }
    match Severity::parse(severity) {
        Some(Severity::Critical) => RiskLevel::VeryHigh,
        Some(Severity::High) => RiskLevel::High,
        Some(Severity::Medium) => RiskLevel::Medium,
        Some(Severity::Low) => RiskLevel::Low,
        None => RiskLevel::Unknown,
    }
}

/// Narrative paragraph summarising a report for the print document.
#[must_use]
pub fn analysis(report: &Report) -> String {
    match &report.rows {
        ReportRows::Sensor(rows) if !rows.is_empty() => {
            let n = rows.len();
            let total_readings: i64 = rows.iter().map(|r| r.reading_count).sum();
            let avg_value = rows.iter().map(|r| r.avg_value).sum::<f64>() / n as f64;

            let mut per_type: HashMap<&str, usize> = HashMap::new();
            for row in rows {
                *per_type.entry(row.sensor_type.as_str()).or_default() += 1;
            }
            let (busiest, busiest_count) = most_common(&per_type);
            let busiest_label = crate::domain::SensorType::parse(busiest)
                .map_or_else(|| busiest.replace('_', " "), |t| t.label().to_string());

            let complete = rows
                .iter()
                .filter(|r| r.reading_count >= EXCELLENT_READINGS_PER_DAY)
                .count();
            let complete_pct = complete as f64 * 100.0 / n as f64;
            let verdict = if complete_pct > 70.0 {
                "excellent"
            } else if complete_pct > 40.0 {
                "good"
            } else {
                "in need of improvement"
            };

            format!(
                "Sensor data analysis covers {total_readings} readings across {n} sensor-day records. \
                 The most active sensor type is {busiest_label} with {busiest_count} daily records. \
                 The average sensor value across all records is {avg_value:.2}. \
                 Data quality is {verdict}, with {complete_pct:.1}% of sensor-days carrying \
                 {EXCELLENT_READINGS_PER_DAY} or more readings."
            )
        }
        ReportRows::Pest(rows) if !rows.is_empty() => {
            let n = rows.len();
            let critical = report.summary.critical_alerts;
            let resolved = report.summary.resolved_alerts;
            let critical_pct = critical as f64 * 100.0 / n as f64;
            let resolved_pct = resolved as f64 * 100.0 / n as f64;

            let mut per_pest: HashMap<&str, usize> = HashMap::new();
            for row in rows {
                *per_pest.entry(row.pest_type.as_str()).or_default() += 1;
            }
            let (pest, pest_count) = most_common(&per_pest);

            format!(
                "Pest monitoring recorded {n} alerts during the reporting period. \
                 Critical alerts account for {critical} incidents ({critical_pct:.1}%). \
                 The resolution rate is {resolved_pct:.1}% with {resolved} alerts resolved. \
                 The most frequently detected pest is {pest} with {pest_count} occurrences."
            )
        }
        ReportRows::Sensor(_) | ReportRows::Pest(_) => "No data available for analysis during the selected period. \
             This could indicate system downtime, sensor maintenance or a lack of activity."
            .to_string(),
    }
}

/// Highest count wins; ties go to the alphabetically first key so output is stable.
fn most_common<'a>(counts: &HashMap<&'a str, usize>) -> (&'a str, usize) {
    counts
        .iter()
        .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then_with(|| kb.cmp(ka)))
        .map_or(("", 0), |(k, c)| (*k, *c))
}
