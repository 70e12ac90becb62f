//! Persistence over the data service (`POST {base}/save_data`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PoolConfig;
use crate::core::{Category, PersistRecord, Persistence, PipelineError, PoolError};

/// Wire body of a `save_data` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDataRequest {
    /// Item the data belongs to.
    #[serde(rename = "tickerSymbol")]
    pub ticker_symbol: String,
    /// Payload category.
    #[serde(rename = "type")]
    pub category: Category,
    /// Payload.
    pub data: serde_json::Value,
    /// Local CSV the service loads historical data from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl From<PersistRecord> for SaveDataRequest {
    fn from(record: PersistRecord) -> Self {
        let file_path = match record.category {
            Category::HistoricalData => record
                .payload
                .get("file_path")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string),
            Category::Transactions | Category::DirectorInterests => None,
        };
        Self {
            ticker_symbol: record.item,
            category: record.category,
            data: record.payload,
            file_path,
        }
    }
}

/// Posts every record to the data service. No retries.
#[derive(Debug, Clone)]
pub struct HttpPersistence {
    client: Client,
    base_url: String,
}

impl HttpPersistence {
    /// Create a persistence client for the service at `base_url`.
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

    /// Create a client from `config.persistence_url` with a 30 s request timeout.
    ///
    /// # Errors
    ///
    /// See [`HttpPersistence::new`].
    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        Self::new(config.persistence_url.clone(), Duration::from_secs(30))
    }

    /// Endpoint records are posted to.
    pub fn endpoint(&self) -> String {
        format!("{}/save_data", self.base_url)
    }
}

#[async_trait]
impl Persistence for HttpPersistence {
    async fn save(&self, record: PersistRecord) -> Result<(), PipelineError> {
        let body = SaveDataRequest::from(record);
        debug!(item = %body.ticker_symbol, category = %body.category, "saving record");

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Persistence(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }
        Ok(())
    }
}
