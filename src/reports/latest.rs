use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, Statement};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::SensorType;
use crate::error::AppResult;
use crate::evaluation::{classify, Evaluation, ThresholdSet};

/// A registered sensor and its most recent persisted reading, if any.
#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult, ToSchema)]
pub struct SensorLatest {
    pub sensor_id: Uuid,
    pub sensor_name: String,
    pub sensor_type: String,
    pub location: Option<String>,
    pub latest_value: Option<f64>,
    pub unit: Option<String>,
    pub last_reading: Option<DateTime<Utc>>,
}

impl SensorLatest {
    /// Classify the latest value. `None` for unknown types or sensors without readings.
    #[must_use]
    pub fn evaluate(&self, thresholds: &ThresholdSet) -> Option<Evaluation> {
        let sensor_type = SensorType::parse(&self.sensor_type)?;
        let value = self.latest_value.filter(|v| v.is_finite())?;
        Some(classify(sensor_type, value, &thresholds.get(sensor_type)))
    }
}

/// Active sensors with their latest reading, ordered by type then name.
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn latest_readings(db: &DatabaseConnection) -> AppResult<Vec<SensorLatest>> {
    let sql = r"
        SELECT
            s.id AS sensor_id,
            s.sensor_name,
            s.sensor_type,
            s.location,
            sr.value AS latest_value,
            COALESCE(sr.unit, s.unit) AS unit,
            sr.recorded_at AS last_reading
        FROM sensors s
        LEFT JOIN (
            SELECT DISTINCT ON (sensor_id) sensor_id, value, unit, recorded_at
            FROM sensor_readings
            ORDER BY sensor_id, recorded_at DESC
        ) sr ON s.id = sr.sensor_id
        WHERE COALESCE(s.is_active, TRUE)
        ORDER BY s.sensor_type, s.sensor_name
    ";

    let rows = SensorLatest::find_by_statement(Statement::from_string(
        db.get_database_backend(),
        sql,
    ))
    .all(db)
    .await?;

    Ok(rows)
}
