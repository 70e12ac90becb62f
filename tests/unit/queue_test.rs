//! Tests for the shared work queue

use std::sync::Arc;
use std::thread;

use prometheus_scrape_pool::core::WorkQueue;

#[test]
fn test_push_after_drain() {
    let queue = WorkQueue::from_items(["A"]);
    assert_eq!(queue.pop(), Some("A"));
    assert!(queue.is_empty());
    queue.push("B");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pop(), Some("B"));
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_concurrent_push_and_pop_lose_nothing() {
    let queue = Arc::new(WorkQueue::new());
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..250 {
                    queue.push(p * 1000 + i);
                }
            })
        })
        .collect();
    for handle in producers {
        handle.join().unwrap();
    }

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(item) = queue.pop() {
                    got.push(item);
                }
                got
            })
        })
        .collect();
    let mut all: Vec<u32> = consumers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 1000);
}
