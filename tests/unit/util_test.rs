//! Tests for utility functions

use prometheus_scrape_pool::util::{init_tracing, now_ms};

#[test]
fn test_now_ms_is_after_2024() {
    // 2024-01-01T00:00:00Z
    assert!(now_ms() > 1_704_067_200_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized twice without panicking");
}
