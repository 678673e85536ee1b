//! Persisted key/value settings: sensor logging interval and threshold bands.
//!
//! Values are read on every request; there is no caching layer.

use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::collections::HashMap;

use crate::domain::SensorType;
use crate::entity::user_settings;
use crate::error::{AppError, AppResult};
use crate::evaluation::{Threshold, ThresholdSet};

pub const LOGGING_INTERVAL_KEY: &str = "sensor_logging_interval";
pub const DEFAULT_LOGGING_INTERVAL_MINUTES: f64 = 30.0;
pub const MIN_LOGGING_INTERVAL_MINUTES: f64 = 0.1;
pub const MAX_LOGGING_INTERVAL_MINUTES: f64 = 1440.0;

const THRESHOLD_PREFIX: &str = "threshold_";

#[must_use]
pub fn threshold_key(sensor_type: SensorType, bound: &str) -> String {
    format!("{THRESHOLD_PREFIX}{sensor_type}_{bound}")
}

/// Build the threshold set from raw key/value pairs.
///
/// A type whose stored pair is missing, unparsable or inverted keeps its
/// factory default.
#[must_use]
pub fn thresholds_from_pairs(pairs: &HashMap<String, String>) -> ThresholdSet {
    let mut set = ThresholdSet::default();

    for sensor_type in SensorType::ALL {
        let min = pairs.get(&threshold_key(sensor_type, "min"));
        let max = pairs.get(&threshold_key(sensor_type, "max"));
        let (Some(min), Some(max)) = (min, max) else {
            continue;
        };

        let parsed = min
            .trim()
            .parse::<f64>()
            .ok()
            .zip(max.trim().parse::<f64>().ok());

        match parsed.map(|(lo, hi)| Threshold::new(lo, hi)) {
            Some(Ok(threshold)) => set.set(sensor_type, threshold),
            Some(Err(e)) => {
                tracing::warn!(sensor_type = %sensor_type, error = %e, "Stored threshold rejected, using default");
            }
            None => {
                tracing::warn!(sensor_type = %sensor_type, min = %min, max = %max, "Stored threshold is not numeric, using default");
            }
        }
    }

    set
}

/// Load the current threshold bands for every sensor type.
///
/// # Errors
///
/// Returns `AppError::Database` if the settings query fails.
pub async fn load_thresholds(db: &DatabaseConnection) -> AppResult<ThresholdSet> {
    let pairs: HashMap<String, String> = user_settings::Entity::find()
        .filter(user_settings::Column::SettingKey.starts_with(THRESHOLD_PREFIX))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.setting_key, s.setting_value))
        .collect();

    Ok(thresholds_from_pairs(&pairs))
}

/// Persist the band for one sensor type. The band is validated on construction.
///
/// # Errors
///
/// Returns `AppError::Database` if the upsert fails.
pub async fn save_threshold(
    db: &DatabaseConnection,
    sensor_type: SensorType,
    threshold: Threshold,
) -> AppResult<()> {
    let now = Utc::now();
    let rows = [
        (threshold_key(sensor_type, "min"), threshold.min()),
        (threshold_key(sensor_type, "max"), threshold.max()),
    ]
    .into_iter()
    .map(|(key, value)| user_settings::ActiveModel {
        setting_key: Set(key),
        setting_value: Set(value.to_string()),
        updated_at: Set(Some(now.into())),
    });

    user_settings::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::column(user_settings::Column::SettingKey)
                .update_columns([
                    user_settings::Column::SettingValue,
                    user_settings::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

    tracing::info!(
        sensor_type = %sensor_type,
        min = threshold.min(),
        max = threshold.max(),
        "Threshold updated"
    );
    Ok(())
}

/// Parse a stored logging interval, falling back to the default.
#[must_use]
pub fn parse_logging_interval(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|m| (MIN_LOGGING_INTERVAL_MINUTES..=MAX_LOGGING_INTERVAL_MINUTES).contains(m))
        .unwrap_or(DEFAULT_LOGGING_INTERVAL_MINUTES)
}

/// Current sensor logging interval in minutes.
///
/// # Errors
///
/// Returns `AppError::Database` if the settings query fails.
pub async fn logging_interval(db: &DatabaseConnection) -> AppResult<f64> {
    let row = user_settings::Entity::find_by_id(LOGGING_INTERVAL_KEY.to_string())
        .one(db)
        .await?;

    Ok(parse_logging_interval(
        row.as_ref().map(|r| r.setting_value.as_str()),
    ))
}

/// Validate a logging interval in minutes.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when outside 0.1..=1440 minutes.
pub fn validate_logging_interval(minutes: f64) -> AppResult<f64> {
    if !minutes.is_finite()
        || !(MIN_LOGGING_INTERVAL_MINUTES..=MAX_LOGGING_INTERVAL_MINUTES).contains(&minutes)
    {
        return Err(AppError::BadRequest(format!(
            "Logging interval must be between {MIN_LOGGING_INTERVAL_MINUTES} and {MAX_LOGGING_INTERVAL_MINUTES} minutes"
        )));
    }
    Ok(minutes)
}

/// Persist a new logging interval.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an out-of-range interval and
/// `AppError::Database` if the upsert fails.
pub async fn set_logging_interval(db: &DatabaseConnection, minutes: f64) -> AppResult<()> {
    let minutes = validate_logging_interval(minutes)?;

    let row = user_settings::ActiveModel {
        setting_key: Set(LOGGING_INTERVAL_KEY.to_string()),
        setting_value: Set(minutes.to_string()),
        updated_at: Set(Some(Utc::now().into())),
    };

    user_settings::Entity::insert(row)
        .on_conflict(
            OnConflict::column(user_settings::Column::SettingKey)
                .update_columns([
                    user_settings::Column::SettingValue,
                    user_settings::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

    tracing::info!(minutes, "Sensor logging interval updated");
    Ok(())
}
