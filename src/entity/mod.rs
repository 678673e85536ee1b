pub mod pest_alerts;
pub mod sensor_readings;
pub mod sensors;
pub mod user_settings;
