//! In-memory persistence.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{Category, PersistRecord, Persistence, PipelineError};

/// Keeps every saved record in memory. Categories can be set to fail.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    records: Mutex<Vec<PersistRecord>>,
    failing: Mutex<HashSet<Category>>,
}

impl InMemoryPersistence {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every later save of `category`.
    pub fn fail_category(&self, category: Category) {
        self.failing.lock().insert(category);
    }

    /// All records saved so far, in save order.
    pub fn records(&self) -> Vec<PersistRecord> {
        self.records.lock().clone()
    }

    /// Records saved for `item`.
    pub fn records_for(&self, item: &str) -> Vec<PersistRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.item == item)
            .cloned()
            .collect()
    }

    /// Number of records saved.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was saved yet.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn save(&self, record: PersistRecord) -> Result<(), PipelineError> {
        if self.failing.lock().contains(&record.category) {
            return Err(PipelineError::Persistence(format!(
                "{} rejected for {}",
                record.category, record.item
            )));
        }
        self.records.lock().push(record);
        Ok(())
    }
}
