//! Client for the external sensor bridge relaying live Arduino readings.

pub mod client;
pub mod live;
pub mod models;

pub use client::BridgeClient;
pub use live::{evaluate_snapshot, LiveEvaluation, LiveFeed, LiveStatus, LiveView};
pub use models::{HistoricalEntry, LiveReading, LiveSnapshot};
