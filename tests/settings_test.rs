//! Stored settings: threshold pairs and the sensor logging interval.
//!
//! Run with: cargo test --test settings_test

use sea_orm::{DatabaseBackend, MockDatabase};
use std::collections::HashMap;
use tokio_test::{assert_err, assert_ok};

use farm_monitor::domain::SensorType;
use farm_monitor::entity::user_settings;
use farm_monitor::error::AppError;
use farm_monitor::evaluation::{Threshold, ThresholdSet};
use farm_monitor::settings::{
    load_thresholds, logging_interval, parse_logging_interval, set_logging_interval,
    threshold_key, thresholds_from_pairs, validate_logging_interval,
    DEFAULT_LOGGING_INTERVAL_MINUTES,
};

fn pairs(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn setting(key: &str, value: &str) -> user_settings::Model {
    user_settings::Model {
        setting_key: key.to_string(),
        setting_value: value.to_string(),
        updated_at: None,
    }
}

#[test]
fn threshold_keys() {
    assert_eq!(threshold_key(SensorType::Temperature, "min"), "threshold_temperature_min");
    assert_eq!(threshold_key(SensorType::SoilMoisture, "max"), "threshold_soil_moisture_max");
}

#[test]
fn stored_pairs_override_defaults() {
    let set = thresholds_from_pairs(&pairs(&[
        ("threshold_temperature_min", "18"),
        ("threshold_temperature_max", "30.5"),
    ]));

    assert_eq!(set.temperature, Threshold::new(18.0, 30.5).unwrap());
    assert_eq!(set.humidity, ThresholdSet::default().humidity);
}

#[test]
fn bad_pairs_fall_back_to_defaults() {
    let set = thresholds_from_pairs(&pairs(&[
        // inverted
        ("threshold_temperature_min", "30"),
        ("threshold_temperature_max", "20"),
        // not a number
        ("threshold_humidity_min", "wet"),
        ("threshold_humidity_max", "80"),
        // half a pair
        ("threshold_soil_moisture_min", "35"),
    ]));

    assert_eq!(set, ThresholdSet::default());
}

#[test]
fn logging_interval_parsing() {
    assert_eq!(parse_logging_interval(Some("15")), 15.0);
    assert_eq!(parse_logging_interval(Some(" 0.5 ")), 0.5);
    assert_eq!(parse_logging_interval(Some("abc")), DEFAULT_LOGGING_INTERVAL_MINUTES);
    assert_eq!(parse_logging_interval(Some("0")), DEFAULT_LOGGING_INTERVAL_MINUTES);
    assert_eq!(parse_logging_interval(Some("5000")), DEFAULT_LOGGING_INTERVAL_MINUTES);
    assert_eq!(parse_logging_interval(None), DEFAULT_LOGGING_INTERVAL_MINUTES);
}

#[test]
fn logging_interval_bounds() {
    assert_ok!(validate_logging_interval(0.1));
    assert_ok!(validate_logging_interval(1440.0));
    assert!(matches!(
        assert_err!(validate_logging_interval(0.05)),
        AppError::BadRequest(_)
    ));
    assert_err!(validate_logging_interval(1441.0));
    assert_err!(validate_logging_interval(f64::NAN));
}

#[tokio::test]
async fn thresholds_load_from_settings_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            setting("threshold_humidity_min", "55"),
            setting("threshold_humidity_max", "85"),
        ]])
        .into_connection();

    let set = load_thresholds(&db).await.unwrap();
    assert_eq!(set.humidity, Threshold::new(55.0, 85.0).unwrap());
    assert_eq!(set.temperature, ThresholdSet::default().temperature);
}

#[tokio::test]
async fn missing_logging_interval_uses_default() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user_settings::Model>::new()])
        .into_connection();

    assert_eq!(
        logging_interval(&db).await.unwrap(),
        DEFAULT_LOGGING_INTERVAL_MINUTES
    );
}

#[tokio::test]
async fn out_of_range_interval_is_rejected_before_writing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let err = assert_err!(set_logging_interval(&db, 0.0).await);
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(db.into_transaction_log().is_empty());
}
