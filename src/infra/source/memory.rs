//! In-memory item source.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{ItemSource, PoolError, WorkItem};

/// Serves a fixed list of items. A failure can be injected for the next fetch.
#[derive(Debug)]
pub struct StaticItemSource<I> {
    items: Mutex<Vec<I>>,
    next_error: Mutex<Option<String>>,
    fetches: Mutex<u32>,
}

impl<I: WorkItem> StaticItemSource<I> {
    /// Create a source returning `items` on every fetch.
    pub fn new(items: impl IntoIterator<Item = I>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
            next_error: Mutex::new(None),
            fetches: Mutex::new(0),
        }
    }

    /// Replace the items returned by later fetches.
    pub fn set_items(&self, items: impl IntoIterator<Item = I>) {
        *self.items.lock() = items.into_iter().collect();
    }

    /// Make the next fetch fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.next_error.lock() = Some(message.into());
    }

    /// Number of fetches served so far, failed ones included.
    pub fn fetch_count(&self) -> u32 {
        *self.fetches.lock()
    }
}

#[async_trait]
impl<I: WorkItem> ItemSource<I> for StaticItemSource<I> {
    async fn fetch_items(&self) -> Result<Vec<I>, PoolError> {
        *self.fetches.lock() += 1;
        if let Some(message) = self.next_error.lock().take() {
            return Err(PoolError::ItemSource(message));
        }
        Ok(self.items.lock().clone())
    }
}
