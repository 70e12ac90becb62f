//! Scraped page records and the persistence collaborator contract.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::pipeline::PipelineError;

/// One row of a director transactions table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorTransaction {
    /// Transaction date as printed on the page.
    pub date: String,
    /// Director name.
    pub director_name: String,
    /// Buy, sell, issued, ...
    pub transaction_type: String,
    /// Number of shares.
    pub amount: String,
    /// Price per share.
    pub price: String,
    /// Total value.
    pub value: String,
    /// Free-form notes.
    pub notes: String,
}

/// One row of a director interests table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorInterest {
    /// Director name.
    pub director: String,
    /// Date of the last notice.
    pub last_notice: String,
    /// Directly held shares.
    pub direct_shares: String,
    /// Indirectly held shares.
    pub indirect_shares: String,
    /// Options held.
    pub options: String,
    /// Convertibles held.
    pub convertibles: String,
}

/// Everything extracted from a single ready page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// Director transactions, possibly empty.
    pub transactions: Vec<DirectorTransaction>,
    /// Director interests, possibly empty.
    pub director_interests: Vec<DirectorInterest>,
    /// Link to the historical price download, when the page offers one.
    pub historical_download_url: Option<String>,
}

/// Kind of payload handed to the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Director transactions table.
    Transactions,
    /// Director interests table.
    DirectorInterests,
    /// Secondary artifact: historical price data.
    HistoricalData,
}

impl Category {
    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::DirectorInterests => "director_interests",
            Self::HistoricalData => "historical_data",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Historical price data saved to local storage by the execution context.
///
/// The data service loads the CSV from `file_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalArtifact {
    /// Link the file was downloaded from.
    pub download_url: String,
    /// Where the file was saved.
    pub file_path: String,
}

/// An `(item, category, payload)` tuple pushed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistRecord {
    /// Item identifier, rendered with `Display`.
    pub item: String,
    /// Payload category.
    pub category: Category,
    /// JSON payload.
    pub payload: serde_json::Value,
}

impl PersistRecord {
    /// Build a record from any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Extraction`] if the payload cannot be
    /// represented as JSON.
    pub fn new<T: Serialize>(
        item: impl Into<String>,
        category: Category,
        payload: &T,
    ) -> Result<Self, PipelineError> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| PipelineError::Extraction(format!("payload not serializable: {e}")))?;
        Ok(Self {
            item: item.into(),
            category,
            payload,
        })
    }
}

/// Push interface accepting scrape results.
///
/// Idempotency is the consumer's concern; this layer does not retry.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    /// Persist one record.
    async fn save(&self, record: PersistRecord) -> Result<(), PipelineError>;
}
