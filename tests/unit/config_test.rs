//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_scrape_pool::config::{PoolConfig, RetryPolicy, RunOptions};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let cfg = PoolConfig::default();
    assert!(cfg.validate().is_ok());
    assert!((1..=8).contains(&cfg.target_workers));
    assert_eq!(cfg.item_timeout(), Duration::from_secs(600));
    assert_eq!(cfg.readiness, RetryPolicy::new(10, 1_000));
    assert_eq!(cfg.challenge, RetryPolicy::new(20, 2_000));
    assert!(!cfg.options.persist_artifacts);
    assert!(cfg.options.close_contexts_on_completion);
}

#[test]
fn test_invalid_timeout() {
    let cfg = PoolConfig::default().with_item_timeout_secs(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_event_capacity() {
    let cfg = PoolConfig::default().with_event_capacity(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_template_must_contain_placeholder() {
    let cfg = PoolConfig::default().with_page_url_template("https://example.invalid/asx");
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("{item}"));
}

#[test]
fn test_zero_attempt_policy_rejected() {
    let cfg = PoolConfig::default().with_challenge(RetryPolicy::new(0, 2_000));
    assert!(cfg.validate().unwrap_err().contains("challenge"));
}

#[test]
fn test_from_json_fills_defaults() {
    let cfg = PoolConfig::from_json_str(
        r#"{ "target_workers": 3, "options": { "persist_artifacts": true } }"#,
    )
    .unwrap();
    assert_eq!(cfg.target_workers, 3);
    assert_eq!(
        cfg.options,
        RunOptions {
            persist_artifacts: true,
            close_contexts_on_completion: true,
        }
    );
    assert_eq!(cfg.readiness, RetryPolicy::readiness());
}

#[test]
fn test_from_json_rejects_invalid() {
    assert!(PoolConfig::from_json_str(r#"{ "item_timeout_secs": 0 }"#).is_err());
    assert!(PoolConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup_overrides() {
    let cfg = PoolConfig::from_lookup(lookup(&[
        ("SCRAPE_POOL_TARGET_WORKERS", "5"),
        ("SCRAPE_POOL_ITEM_TIMEOUT_SECS", " 120 "),
        ("SCRAPE_POOL_CHALLENGE_ATTEMPTS", "4"),
        ("SCRAPE_POOL_PERSIST_ARTIFACTS", "true"),
        ("SCRAPE_POOL_SOURCE_URL", "http://tickers.internal:8080"),
    ]))
    .unwrap();
    assert_eq!(cfg.target_workers, 5);
    assert_eq!(cfg.item_timeout_secs, 120);
    assert_eq!(cfg.challenge.max_attempts, 4);
    assert_eq!(cfg.challenge.interval_ms, 2_000);
    assert!(cfg.options.persist_artifacts);
    assert_eq!(cfg.source_url, "http://tickers.internal:8080");
    assert_eq!(cfg.persistence_url, "http://127.0.0.1:5000");
}

#[test]
fn test_from_lookup_reports_bad_values() {
    let err = PoolConfig::from_lookup(lookup(&[("SCRAPE_POOL_TARGET_WORKERS", "many")]))
        .unwrap_err();
    assert!(err.starts_with("SCRAPE_POOL_TARGET_WORKERS"));

    let err = PoolConfig::from_lookup(lookup(&[("SCRAPE_POOL_ITEM_TIMEOUT_SECS", "0")]))
        .unwrap_err();
    assert!(err.contains("item_timeout_secs"));
}
