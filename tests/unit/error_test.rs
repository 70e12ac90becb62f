//! Tests for error types

use prometheus_scrape_pool::core::{PipelineError, PoolError};

#[test]
fn test_item_source_error() {
    let err = PoolError::ItemSource("connection refused".to_string());
    assert_eq!(format!("{}", err), "item source failed: connection refused");
}

#[test]
fn test_no_items_error() {
    assert_eq!(PoolError::NoItems.to_string(), "item source returned no items");
}

#[test]
fn test_context_creation_error() {
    let err = PoolError::ContextCreation("browser gone".to_string());
    assert_eq!(
        err.to_string(),
        "execution context creation failed: browser gone"
    );
}

#[test]
fn test_missing_component_error() {
    let err = PoolError::MissingComponent("pipeline");
    assert_eq!(err.to_string(), "missing component: pipeline");
}

#[test]
fn test_challenge_error_reports_attempts() {
    let err = PipelineError::ChallengeNotCleared { attempts: 20 };
    assert_eq!(
        err.to_string(),
        "anti-automation challenge did not clear after 20 attempts"
    );
}

#[test]
fn test_pool_error_converts_to_anyhow() {
    let err: anyhow::Error = PoolError::NoItems.into();
    assert!(err.downcast_ref::<PoolError>().is_some());
}
