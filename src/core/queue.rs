//! Shared FIFO work queue.
//!
//! Every operation takes the internal `parking_lot::Mutex` for the shortest
//! possible critical section, so a popped item is owned by exactly one caller
//! and no two concurrent pops can observe the same item.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Thread-safe FIFO of work items.
#[derive(Debug)]
pub struct WorkQueue<I> {
    items: Mutex<VecDeque<I>>,
}

impl<I> Default for WorkQueue<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> WorkQueue<I> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Create a queue pre-filled with `items` in iteration order.
    pub fn from_items(items: impl IntoIterator<Item = I>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }

    /// Append one item at the back.
    pub fn push(&self, item: I) {
        self.items.lock().push_back(item);
    }

    /// Append several items at the back, preserving their order.
    pub fn extend(&self, items: impl IntoIterator<Item = I>) {
        self.items.lock().extend(items);
    }

    /// Remove and return the front item, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<I> {
        self.items.lock().pop_front()
    }

    /// Whether the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Drop every queued item and return how many were removed.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let removed = items.len();
        items.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let q = WorkQueue::from_items(["A", "B", "C"]);
        q.push("D");
        assert_eq!(q.len(), 4);
        assert_eq!(q.pop(), Some("A"));
        assert_eq!(q.pop(), Some("B"));
        assert_eq!(q.pop(), Some("C"));
        assert_eq!(q.pop(), Some("D"));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear() {
        let q = WorkQueue::from_items(1..=5);
        assert_eq!(q.clear(), 5);
        assert!(q.is_empty());
    }

    #[test]
    fn test_concurrent_pops_are_exclusive() {
        let total = 10_000;
        let q = Arc::new(WorkQueue::from_items(0..total));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(item) = q.pop() {
                        taken.push(item);
                    }
                    taken
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let taken = handle.join().unwrap();
            // Each thread observes a strictly increasing subsequence of the FIFO.
            assert!(taken.windows(2).all(|w| w[0] < w[1]));
            for item in taken {
                assert!(seen.insert(item), "item {item} popped twice");
            }
        }
        assert_eq!(seen.len(), total);
    }
}
