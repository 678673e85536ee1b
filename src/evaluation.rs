//! Threshold evaluation of sensor readings.
//!
//! A reading is classified into a [`StatusTier`] and paired with a remark whose
//! tone escalates with the tier: informational when optimal, actionable when
//! outside the band, urgent when critically outside it.
//!
//! Temperature and humidity are judged against the configurable band of their
//! [`ThresholdSet`]. Soil moisture uses fixed agronomic bands and ignores the
//! configured band:
//!
//! | Value (%)     | Tier          |
//! |---------------|---------------|
//! | `<= 20`       | critical low  |
//! | `(20, 40]`    | low (dry)     |
//! | `(40, 60]`    | optimal       |
//! | `(60, 81)`    | high (moist)  |
//! | `>= 81`       | critical high |

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::SensorType;

/// Share of the band width a reading may exceed a bound before turning critical.
pub const CRITICAL_MARGIN_RATIO: f64 = 0.5;

pub const SOIL_CRITICAL_LOW_MAX: f64 = 20.0;
pub const SOIL_DRY_MAX: f64 = 40.0;
pub const SOIL_OPTIMAL_MAX: f64 = 60.0;
pub const SOIL_SATURATED_MIN: f64 = 81.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold bounds must be finite numbers")]
    NotFinite,
    #[error("minimum must be lower than maximum")]
    Inverted,
}

/// Optimal band for one sensor type. Invariant: `min < max`, both finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Threshold {
    min: f64,
    max: f64,
}

impl Threshold {
    /// # Errors
    ///
    /// Returns `ThresholdError` when a bound is not finite or `min >= max`.
    pub fn new(min: f64, max: f64) -> Result<Self, ThresholdError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ThresholdError::NotFinite);
        }
        if min >= max {
            return Err(ThresholdError::Inverted);
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Factory default band for a sensor type.
    #[must_use]
    pub const fn default_for(sensor_type: SensorType) -> Self {
        match sensor_type {
            SensorType::Temperature => Self { min: 20.0, max: 28.0 },
            SensorType::Humidity => Self { min: 60.0, max: 80.0 },
            SensorType::SoilMoisture => Self { min: 40.0, max: 60.0 },
        }
    }
}

/// One band per sensor type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ThresholdSet {
    pub temperature: Threshold,
    pub humidity: Threshold,
    pub soil_moisture: Threshold,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            temperature: Threshold::default_for(SensorType::Temperature),
            humidity: Threshold::default_for(SensorType::Humidity),
            soil_moisture: Threshold::default_for(SensorType::SoilMoisture),
        }
    }
}

impl ThresholdSet {
    #[must_use]
    pub const fn get(&self, sensor_type: SensorType) -> Threshold {
        match sensor_type {
            SensorType::Temperature => self.temperature,
            SensorType::Humidity => self.humidity,
            SensorType::SoilMoisture => self.soil_moisture,
        }
    }

    pub fn set(&mut self, sensor_type: SensorType, threshold: Threshold) {
        match sensor_type {
            SensorType::Temperature => self.temperature = threshold,
            SensorType::Humidity => self.humidity = threshold,
            SensorType::SoilMoisture => self.soil_moisture = threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusTier {
    Optimal,
    High,
    Low,
    CriticalHigh,
    CriticalLow,
}

impl StatusTier {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Optimal => "Optimal",
            Self::High => "High",
            Self::Low => "Low",
            Self::CriticalHigh => "Critical high",
            Self::CriticalLow => "Critical low",
        }
    }

    /// 0 for optimal, 1 for out of band, 2 for critical.
    #[must_use]
    pub const fn severity_rank(self) -> u8 {
        match self {
            Self::Optimal => 0,
            Self::High | Self::Low => 1,
            Self::CriticalHigh | Self::CriticalLow => 2,
        }
    }

    #[must_use]
    pub const fn is_critical(self) -> bool {
        self.severity_rank() == 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Evaluation {
    pub tier: StatusTier,
    pub remark: String,
}

/// Classify a validated, finite reading and produce its remark.
#[must_use]
pub fn classify(sensor_type: SensorType, value: f64, threshold: &Threshold) -> Evaluation {
    let tier = match sensor_type {
        SensorType::Temperature | SensorType::Humidity => band_tier(value, threshold),
        SensorType::SoilMoisture => soil_tier(value),
    };
    Evaluation {
        tier,
        remark: remark(sensor_type, value, tier, threshold),
    }
}

fn band_tier(value: f64, threshold: &Threshold) -> StatusTier {
    let margin = CRITICAL_MARGIN_RATIO * threshold.width();
    if threshold.contains(value) {
        StatusTier::Optimal
    } else if value > threshold.max() + margin {
        StatusTier::CriticalHigh
    } else if value > threshold.max() {
        StatusTier::High
    } else if value < threshold.min() - margin {
        StatusTier::CriticalLow
    } else {
        StatusTier::Low
    }
}

fn soil_tier(value: f64) -> StatusTier {
    if value <= SOIL_CRITICAL_LOW_MAX {
        StatusTier::CriticalLow
    } else if value <= SOIL_DRY_MAX {
        StatusTier::Low
    } else if value <= SOIL_OPTIMAL_MAX {
        StatusTier::Optimal
    } else if value < SOIL_SATURATED_MIN {
        StatusTier::High
    } else {
        StatusTier::CriticalHigh
    }
}

/// Optimal range as shown to users, e.g. `20.0-28.0°C`.
#[must_use]
pub fn optimal_range_text(sensor_type: SensorType, threshold: &Threshold) -> String {
    let unit = sensor_type.default_unit();
    match sensor_type {
        SensorType::SoilMoisture => format!("{SOIL_DRY_MAX:.0}-{SOIL_OPTIMAL_MAX:.0}{unit}"),
        SensorType::Temperature | SensorType::Humidity => {
            format!("{:.1}-{:.1}{unit}", threshold.min(), threshold.max())
        }
    }
}

fn remark(sensor_type: SensorType, value: f64, tier: StatusTier, threshold: &Threshold) -> String {
    let unit = sensor_type.default_unit();
    let label = sensor_type.label();
    let range = optimal_range_text(sensor_type, threshold);

    match tier {
        StatusTier::Optimal => format!(
            "{label} is {value:.1}{unit}, within the optimal range of {range}. No action needed."
        ),
        StatusTier::High => format!(
            "{label} is {value:.1}{unit}, above the optimal range of {range}. {}",
            action(sensor_type, tier)
        ),
        StatusTier::Low => format!(
            "{label} is {value:.1}{unit}, below the optimal range of {range}. {}",
            action(sensor_type, tier)
        ),
        StatusTier::CriticalHigh => format!(
            "URGENT: {label} is {value:.1}{unit}, far above the optimal range of {range}. {}",
            action(sensor_type, tier)
        ),
        StatusTier::CriticalLow => format!(
            "URGENT: {label} is {value:.1}{unit}, far below the optimal range of {range}. {}",
            action(sensor_type, tier)
        ),
    }
}

fn action(sensor_type: SensorType, tier: StatusTier) -> &'static str {
    match (sensor_type, tier) {
        (_, StatusTier::Optimal) => "No action needed.",
        (SensorType::Temperature, StatusTier::High) => "Increase ventilation or provide shade.",
        (SensorType::Temperature, StatusTier::CriticalHigh) => {
            "Cool the growing area immediately to prevent heat stress."
        }
        (SensorType::Temperature, StatusTier::Low) => "Protect crops from cold with covers.",
        (SensorType::Temperature, StatusTier::CriticalLow) => {
            "Apply frost protection immediately."
        }
        (SensorType::Humidity, StatusTier::High) => {
            "Improve air circulation to reduce fungal disease risk."
        }
        (SensorType::Humidity, StatusTier::CriticalHigh) => {
            "Ventilate now; fungal outbreaks are likely at this level."
        }
        (SensorType::Humidity, StatusTier::Low) => "Consider misting to raise humidity.",
        (SensorType::Humidity, StatusTier::CriticalLow) => {
            "Mist or irrigate immediately to prevent wilting."
        }
        (SensorType::SoilMoisture, StatusTier::High) => "Soil is moist; hold off on irrigation.",
        (SensorType::SoilMoisture, StatusTier::CriticalHigh) => {
            "Soil is saturated; stop irrigation and check drainage immediately."
        }
        (SensorType::SoilMoisture, StatusTier::Low) => "Soil is drying out; schedule irrigation.",
        (SensorType::SoilMoisture, StatusTier::CriticalLow) => {
            "Soil is critically dry; irrigate immediately."
        }
    }
}
