use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::SensorType;

/// Response of `?action=get_all`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<LiveSnapshot>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Latest value per sensor type as relayed by the bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiveSnapshot {
    #[serde(default)]
    pub temperature: Option<LiveReading>,
    #[serde(default)]
    pub humidity: Option<LiveReading>,
    #[serde(default)]
    pub soil_moisture: Option<LiveReading>,
}

impl LiveSnapshot {
    #[must_use]
    pub const fn get(&self, sensor_type: SensorType) -> Option<&LiveReading> {
        match sensor_type {
            SensorType::Temperature => self.temperature.as_ref(),
            SensorType::Humidity => self.humidity.as_ref(),
            SensorType::SoilMoisture => self.soil_moisture.as_ref(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        SensorType::ALL.iter().all(|t| self.get(*t).is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiveReading {
    /// Missing or non-numeric values arrive as null
    #[serde(default)]
    pub value: Option<f64>,
    /// Bridge-side status, e.g. `active` or `simulated`
    #[serde(default)]
    pub status: Option<String>,
    /// Bridge local time, `YYYY-mm-dd HH:MM:SS`
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response of `?action=get_historical&limit=N`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<HistoricalEntry>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One row of bridge history, all sensor types sampled together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoricalEntry {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}
