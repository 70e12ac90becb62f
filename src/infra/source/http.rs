//! Item source backed by the ticker service (`GET {base}/get_tickers`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::core::{ItemSource, PoolError};

/// Fetches the ticker list as a JSON array of strings.
#[derive(Debug, Clone)]
pub struct HttpItemSource {
    client: Client,
    base_url: String,
}

impl HttpItemSource {
    /// Create a source for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PoolError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a source from `config.source_url` with a 30 s request timeout.
    ///
    /// # Errors
    ///
    /// See [`HttpItemSource::new`].
    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        Self::new(config.source_url.clone(), Duration::from_secs(30))
    }

    /// Endpoint queried by [`ItemSource::fetch_items`].
    pub fn endpoint(&self) -> String {
        format!("{}/get_tickers", self.base_url)
    }
}

#[async_trait]
impl ItemSource<String> for HttpItemSource {
    async fn fetch_items(&self) -> Result<Vec<String>, PoolError> {
        let url = self.endpoint();
        debug!(%url, "fetching items");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PoolError::ItemSource(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PoolError::ItemSource(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let items: Vec<String> = response
            .json()
            .await
            .map_err(|e| PoolError::ItemSource(format!("failed to parse response: {e}")))?;
        info!(count = items.len(), "fetched items");
        Ok(items)
    }
}
