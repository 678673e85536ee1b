//! Live bridge snapshots: parsing, classification and the stale fallback.
//!
//! Run with: cargo test --test bridge_live_test

use std::time::Duration;

use farm_monitor::bridge::models::{HistoricalResponse, LiveResponse};
use farm_monitor::bridge::{
    evaluate_snapshot, BridgeClient, LiveFeed, LiveReading, LiveSnapshot, LiveStatus,
};
use farm_monitor::config::Config;
use farm_monitor::domain::SensorType;
use farm_monitor::error::AppError;
use farm_monitor::evaluation::{StatusTier, ThresholdSet};

fn reading(value: Option<f64>) -> LiveReading {
    LiveReading {
        value,
        status: Some("active".to_string()),
        timestamp: Some("2024-06-01 10:00:00".to_string()),
    }
}

fn feed() -> LiveFeed {
    let config = Config::for_database("postgres://localhost/farm_monitor_test");
    let client = BridgeClient::new(&config).unwrap();
    LiveFeed::new(client, Duration::from_secs(300))
}

fn snapshot() -> LiveSnapshot {
    LiveSnapshot {
        temperature: Some(reading(Some(31.0))),
        humidity: Some(reading(Some(70.0))),
        soil_moisture: Some(reading(Some(15.0))),
    }
}

#[test]
fn bridge_payload_parses() {
    let body = r#"{
        "success": true,
        "data": {
            "temperature": {"value": 24.5, "status": "active", "timestamp": "2024-06-01 10:00:00"},
            "humidity": {"value": null, "status": "error"}
        }
    }"#;
    let response: LiveResponse = serde_json::from_str(body).unwrap();
    let data = response.data.unwrap();

    assert!(response.success);
    assert_eq!(data.get(SensorType::Temperature).unwrap().value, Some(24.5));
    assert_eq!(data.get(SensorType::Humidity).unwrap().value, None);
    assert!(data.get(SensorType::SoilMoisture).is_none());
    assert!(!data.is_empty());
    assert!(LiveSnapshot::default().is_empty());

    let history: HistoricalResponse = serde_json::from_str(
        r#"{"success": true, "data": [{"temperature": 22.1, "humidity": 64.0, "soil_moisture": 48.5, "timestamp": "2024-06-01 09:30:00"}]}"#,
    )
    .unwrap();
    assert_eq!(history.data.len(), 1);
    assert_eq!(history.data[0].soil_moisture, Some(48.5));
}

#[test]
fn snapshot_readings_are_classified() {
    let readings = evaluate_snapshot(&snapshot(), &ThresholdSet::default());

    assert_eq!(readings.len(), 3);
    let tiers: Vec<_> = readings
        .iter()
        .map(|r| (r.sensor_type, r.evaluation.as_ref().map(|e| e.tier)))
        .collect();
    assert_eq!(
        tiers,
        vec![
            (SensorType::Temperature, Some(StatusTier::High)),
            (SensorType::Humidity, Some(StatusTier::Optimal)),
            (SensorType::SoilMoisture, Some(StatusTier::CriticalLow)),
        ]
    );
    assert_eq!(readings[0].unit, "°C");
}

#[test]
fn readings_without_value_are_not_classified() {
    let partial = LiveSnapshot {
        temperature: Some(reading(None)),
        humidity: None,
        soil_moisture: Some(reading(Some(f64::NAN))),
    };
    let readings = evaluate_snapshot(&partial, &ThresholdSet::default());

    assert_eq!(readings.len(), 2);
    assert!(readings.iter().all(|r| r.value.is_none() && r.evaluation.is_none()));
}

#[tokio::test]
async fn bridge_outage_falls_back_to_last_good_snapshot() {
    let feed = feed();
    let thresholds = ThresholdSet::default();

    let offline = feed
        .resolve(Err(AppError::Bridge("connection refused".to_string())), &thresholds)
        .await;
    assert_eq!(offline.status, LiveStatus::Offline);
    assert!(offline.readings.is_empty());
    assert!(offline.fetched_at.is_none());

    let live = feed.resolve(Ok(snapshot()), &thresholds).await;
    assert_eq!(live.status, LiveStatus::Live);
    assert_eq!(live.readings.len(), 3);

    let stale = feed
        .resolve(Err(AppError::Bridge("timeout".to_string())), &thresholds)
        .await;
    assert_eq!(stale.status, LiveStatus::Stale);
    assert_eq!(stale.fetched_at, live.fetched_at);
    assert_eq!(stale.readings, live.readings);
}
