use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Sensor bridge
    pub bridge_base_url: String,
    pub bridge_timeout_seconds: u64,
    pub bridge_connect_timeout_seconds: u64,
    pub bridge_skip_tls_verify: bool,
    pub bridge_cache_ttl_seconds: u64,

    // API settings
    pub api_host: String,
    pub api_port: u16,
    pub login_url: String,

    // Reports
    pub default_report_days: i64,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_reports_per_second: u64,
    pub rate_limit_reports_burst: u32,
    /// Successful exports allowed per user per hour
    pub export_quota_per_hour: u32,

    // Application metadata
    pub deployment: Deployment,
}

/// Read an optional variable, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // Sensor bridge
            bridge_base_url: env::var("BRIDGE_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5001/api/sensors.php".to_string()),
            bridge_timeout_seconds: env_or("BRIDGE_TIMEOUT_SECONDS", 5),
            bridge_connect_timeout_seconds: env_or("BRIDGE_CONNECT_TIMEOUT_SECONDS", 3),
            bridge_skip_tls_verify: env_or("BRIDGE_SKIP_TLS_VERIFY", false),
            bridge_cache_ttl_seconds: env_or("BRIDGE_CACHE_TTL_SECONDS", 300),

            // API settings
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env_or("API_PORT", 3000),
            login_url: env::var("LOGIN_URL").unwrap_or_else(|_| "/login".to_string()),

            // Reports
            default_report_days: env_or("DEFAULT_REPORT_DAYS", 30),

            // Rate limiting
            disable_rate_limiting: env_or("DISABLE_RATE_LIMITING", false),
            rate_limit_reports_per_second: env_or("RATE_LIMIT_REPORTS_PER_SECOND", 2),
            rate_limit_reports_burst: env_or("RATE_LIMIT_REPORTS_BURST", 30),
            export_quota_per_hour: env_or("EXPORT_QUOTA_PER_HOUR", 50),

            // Application metadata
            deployment: Deployment::parse(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        })
    }

    /// Configuration for tests and local tooling: no environment lookups.
    #[must_use]
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bridge_base_url: "http://127.0.0.1:5001/api/sensors.php".to_string(),
            bridge_timeout_seconds: 5,
            bridge_connect_timeout_seconds: 3,
            bridge_skip_tls_verify: false,
            bridge_cache_ttl_seconds: 300,
            api_host: "127.0.0.1".to_string(),
            api_port: 3000,
            login_url: "/login".to_string(),
            default_report_days: 30,
            disable_rate_limiting: true,
            rate_limit_reports_per_second: 2,
            rate_limit_reports_burst: 30,
            export_quota_per_hour: 50,
            deployment: Deployment::Local,
        }
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
