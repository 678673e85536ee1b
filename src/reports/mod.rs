//! Report aggregation over persisted sensor readings and pest alerts.
//!
//! Every report request recomputes its rows, summary and chart series from the
//! database. Nothing here is cached.

pub mod aggregator;
pub mod analysis;
pub mod latest;
pub mod types;

pub use aggregator::{aggregate, aggregate_capped, aggregate_or_empty, build_report, range_bounds};
pub use analysis::{analysis, data_quality, risk_level, DataQuality, RiskLevel};
pub use latest::{latest_readings, SensorLatest};
pub use types::{
    ChartDataset, ChartSeries, PestAlertRow, Report, ReportRows, ReportSummary, SensorDayRow,
};
