//! Live sensor feed with last-known-good fallback.
//!
//! A successful bridge poll refreshes the cached snapshot. A failed poll is
//! logged and answered from the cache (marked stale) or reported as offline.
//! The page never sees a bridge error.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::time::Duration;
use utoipa::ToSchema;

use crate::bridge::client::BridgeClient;
use crate::bridge::models::{HistoricalEntry, LiveSnapshot};
use crate::domain::SensorType;
use crate::error::AppResult;
use crate::evaluation::{classify, Evaluation, ThresholdSet};

const SNAPSHOT_KEY: &str = "live";

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: LiveSnapshot,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    /// Fetched during this request
    Live,
    /// Bridge unreachable, showing the last good snapshot
    Stale,
    Offline,
}

impl LiveStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Live => "Online",
            Self::Stale => "Offline (showing last known readings)",
            Self::Offline => "Offline",
        }
    }
}

/// What the page shows for the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LiveView {
    pub status: LiveStatus,
    pub fetched_at: Option<DateTime<Utc>>,
    pub readings: Vec<LiveEvaluation>,
}

impl LiveView {
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            status: LiveStatus::Offline,
            fetched_at: None,
            readings: Vec::new(),
        }
    }
}

/// A live reading classified against the current threshold band.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LiveEvaluation {
    pub sensor_type: SensorType,
    pub value: Option<f64>,
    pub unit: String,
    pub bridge_status: Option<String>,
    pub timestamp: Option<String>,
    /// Absent when the bridge sent no usable value
    pub evaluation: Option<Evaluation>,
}

/// Classify every reading of a snapshot. Sensor types missing from the
/// snapshot are omitted.
#[must_use]
pub fn evaluate_snapshot(snapshot: &LiveSnapshot, thresholds: &ThresholdSet) -> Vec<LiveEvaluation> {
    SensorType::ALL
        .into_iter()
        .filter_map(|sensor_type| {
            let reading = snapshot.get(sensor_type)?;
            let value = reading.value.filter(|v| v.is_finite());
            Some(LiveEvaluation {
                sensor_type,
                value,
                unit: sensor_type.default_unit().to_string(),
                bridge_status: reading.status.clone(),
                timestamp: reading.timestamp.clone(),
                evaluation: value
                    .map(|v| classify(sensor_type, v, &thresholds.get(sensor_type))),
            })
        })
        .collect()
}

pub struct LiveFeed {
    client: BridgeClient,
    last_good: Cache<&'static str, CachedSnapshot>,
}

impl LiveFeed {
    #[must_use]
    pub fn new(client: BridgeClient, cache_ttl: Duration) -> Self {
        Self {
            client,
            last_good: Cache::builder()
                .max_capacity(1)
                .time_to_live(cache_ttl)
                .build(),
        }
    }

    #[must_use]
    pub const fn client(&self) -> &BridgeClient {
        &self.client
    }

    /// Poll the bridge and classify the result.
    pub async fn current(&self, thresholds: &ThresholdSet) -> LiveView {
        let result = self.client.get_all().await;
        self.resolve(result, thresholds).await
    }

    /// Turn a poll result into a view, refreshing or falling back to the cache.
    pub async fn resolve(
        &self,
        result: AppResult<LiveSnapshot>,
        thresholds: &ThresholdSet,
    ) -> LiveView {
        match result {
            Ok(snapshot) => {
                let fetched_at = Utc::now();
                let readings = evaluate_snapshot(&snapshot, thresholds);
                self.last_good
                    .insert(
                        SNAPSHOT_KEY,
                        CachedSnapshot {
                            snapshot,
                            fetched_at,
                        },
                    )
                    .await;
                LiveView {
                    status: LiveStatus::Live,
                    fetched_at: Some(fetched_at),
                    readings,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, base_url = %self.client.base_url(), "Sensor bridge unavailable");
                match self.last_good.get(SNAPSHOT_KEY).await {
                    Some(cached) => LiveView {
                        status: LiveStatus::Stale,
                        fetched_at: Some(cached.fetched_at),
                        readings: evaluate_snapshot(&cached.snapshot, thresholds),
                    },
                    None => LiveView::offline(),
                }
            }
        }
    }

    /// Bridge history, or an empty list when the bridge is unavailable.
    pub async fn history(&self, limit: u32) -> Vec<HistoricalEntry> {
        match self.client.get_historical(limit).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Sensor bridge history unavailable");
                Vec::new()
            }
        }
    }
}
