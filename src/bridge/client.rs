use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::bridge::models::{HistoricalEntry, HistoricalResponse, LiveResponse, LiveSnapshot};
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Upper bound on rows requested from the bridge history.
pub const MAX_HISTORY_LIMIT: u32 = 500;

pub struct BridgeClient {
    http_client: Client,
    base_url: String,
}

impl BridgeClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        // Tunnelled bridges answer with an HTML interstitial without this
        headers.insert(
            "ngrok-skip-browser-warning",
            reqwest::header::HeaderValue::from_static("true"),
        );

        let http_client = Client::builder()
            .danger_accept_invalid_certs(config.bridge_skip_tls_verify)
            .timeout(Duration::from_secs(config.bridge_timeout_seconds))
            .connect_timeout(Duration::from_secs(config.bridge_connect_timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.bridge_base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Latest reading of every sensor type.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Bridge` if the request fails, returns an error status,
    /// or the bridge reports `success: false`.
    pub async fn get_all(&self) -> AppResult<LiveSnapshot> {
        let response: LiveResponse = self.request(&[("action", "get_all".to_string())]).await?;

        if !response.success {
            return Err(AppError::Bridge(
                response
                    .message
                    .unwrap_or_else(|| "No sensor data available".to_string()),
            ));
        }

        response
            .data
            .ok_or_else(|| AppError::Bridge("Response carried no data".to_string()))
    }

    /// Most recent `limit` history rows, capped at [`MAX_HISTORY_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Bridge` if the request fails, returns an error status,
    /// or the bridge reports `success: false`.
    pub async fn get_historical(&self, limit: u32) -> AppResult<Vec<HistoricalEntry>> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let response: HistoricalResponse = self
            .request(&[
                ("action", "get_historical".to_string()),
                ("limit", limit.to_string()),
            ])
            .await?;

        if !response.success {
            return Err(AppError::Bridge(
                response
                    .message
                    .unwrap_or_else(|| "No historical data available".to_string()),
            ));
        }

        Ok(response.data)
    }

    async fn request<T: DeserializeOwned>(&self, query: &[(&str, String)]) -> AppResult<T> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Bridge(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Bridge(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Bridge(format!("Failed to get response text: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse bridge response"
            );
            AppError::Bridge(format!("Failed to parse response: {e}"))
        })
    }
}
