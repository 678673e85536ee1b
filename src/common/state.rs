use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::{BridgeClient, LiveFeed};
use crate::config::Config;
use crate::export::ExportQuota;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub live: Arc<LiveFeed>,
    pub export_quota: Arc<ExportQuota>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, bridge_client: BridgeClient) -> Self {
        let live = LiveFeed::new(
            bridge_client,
            Duration::from_secs(config.bridge_cache_ttl_seconds),
        );
        let export_quota = ExportQuota::per_hour(config.export_quota_per_hour);

        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            live: Arc::new(live),
            export_quota: Arc::new(export_quota),
        }
    }
}
