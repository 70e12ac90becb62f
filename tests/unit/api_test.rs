//! Tests for the control protocol

use std::sync::Arc;
use std::time::Duration;

use prometheus_scrape_pool::config::{PoolConfig, RunOptions};
use prometheus_scrape_pool::core::PoolController;
use prometheus_scrape_pool::infra::StaticItemSource;
use prometheus_scrape_pool::runtime::{handle_request, ControlRequest, TokioSpawner};
use prometheus_scrape_pool::testing::{fixtures, MockContextFactory, MockPipeline};

fn pool(
    source: Arc<StaticItemSource<String>>,
    pipeline: MockPipeline<String>,
) -> PoolController<String, MockContextFactory, MockPipeline<String>> {
    PoolController::new(
        PoolConfig::default(),
        source,
        MockContextFactory::new(),
        pipeline,
        TokioSpawner::current().unwrap(),
    )
    .unwrap()
}

#[test]
fn test_parse_control_messages() {
    assert_eq!(
        ControlRequest::from_json(r#"{ "action": "start_scraping", "maxTabs": 4 }"#).unwrap(),
        ControlRequest::StartScraping {
            max_tabs: 4,
            options: None
        }
    );
    assert_eq!(
        ControlRequest::from_json(
            r#"{ "action": "start_scraping", "maxTabs": 1,
                 "options": { "persist_artifacts": true, "close_contexts_on_completion": false } }"#
        )
        .unwrap(),
        ControlRequest::StartScraping {
            max_tabs: 1,
            options: Some(RunOptions {
                persist_artifacts: true,
                close_contexts_on_completion: false,
            }),
        }
    );
    assert_eq!(
        ControlRequest::from_json(r#"{ "action": "pause_scraping" }"#).unwrap(),
        ControlRequest::PauseScraping
    );
    assert_eq!(
        ControlRequest::from_json(r#"{ "action": "resume_scraping" }"#).unwrap(),
        ControlRequest::ResumeScraping { delay_ms: None }
    );
    assert_eq!(
        ControlRequest::from_json(r#"{ "action": "resume_scraping", "delay": 1500 }"#).unwrap(),
        ControlRequest::ResumeScraping {
            delay_ms: Some(1500)
        }
    );
    assert_eq!(
        ControlRequest::from_json(r#"{ "action": "get_status" }"#).unwrap(),
        ControlRequest::GetStatus
    );
    assert!(ControlRequest::from_json(r#"{ "action": "reboot" }"#).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_start_pause_resume_round() {
    let pipeline = MockPipeline::new();
    pipeline.hold();
    let pool = pool(
        Arc::new(StaticItemSource::new(fixtures::tickers(8))),
        pipeline.clone(),
    );

    let reply = handle_request(
        &pool,
        ControlRequest::StartScraping {
            max_tabs: 2,
            options: None,
        },
    )
    .await;
    assert!(reply.ok);
    assert!(reply.status.is_running);
    assert_eq!(reply.reconciled.unwrap().spawned, 2);

    // A second start while running retargets.
    let reply = handle_request(
        &pool,
        ControlRequest::StartScraping {
            max_tabs: 3,
            options: None,
        },
    )
    .await;
    assert_eq!(reply.reconciled.unwrap().spawned, 1);

    let reply = handle_request(&pool, ControlRequest::PauseScraping).await;
    assert!(reply.status.is_paused);

    let json = serde_json::to_value(
        handle_request(&pool, ControlRequest::GetStatus).await,
    )
    .unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["is_running"], true);
    assert_eq!(json["is_paused"], true);
    assert_eq!(json["stats"]["target"], 3);
    assert!(json.get("error").is_none());

    let before = tokio::time::Instant::now();
    let reply = handle_request(
        &pool,
        ControlRequest::ResumeScraping {
            delay_ms: Some(2_000),
        },
    )
    .await;
    assert!(before.elapsed() >= Duration::from_secs(2));
    assert!(!reply.status.is_paused);

    pipeline.release();
    pool.wait_until_drained().await;
    let reply = handle_request(&pool, ControlRequest::GetStatus).await;
    assert!(!reply.status.is_running);
    assert_eq!(reply.stats.unwrap().succeeded_items, 8);
}

#[tokio::test(start_paused = true)]
async fn test_failed_start_is_reported() {
    let source = Arc::new(StaticItemSource::new(fixtures::tickers(2)));
    source.fail_next("HTTP 500");
    let pool = pool(source, MockPipeline::new());

    let reply = handle_request(
        &pool,
        ControlRequest::StartScraping {
            max_tabs: 2,
            options: None,
        },
    )
    .await;
    assert!(!reply.ok);
    assert!(!reply.status.is_running);
    assert!(reply.error.unwrap().contains("HTTP 500"));
}

#[tokio::test(start_paused = true)]
async fn test_start_request_carries_run_options() {
    let pipeline = MockPipeline::new();
    pipeline.hold();
    let pool = pool(
        Arc::new(StaticItemSource::new(fixtures::tickers(3))),
        pipeline.clone(),
    );
    let requested = RunOptions {
        persist_artifacts: true,
        close_contexts_on_completion: false,
    };

    let request = ControlRequest::from_json(
        r#"{ "action": "start_scraping", "maxTabs": 1,
             "options": { "persist_artifacts": true, "close_contexts_on_completion": false } }"#,
    )
    .unwrap();
    let reply = handle_request(&pool, request).await;
    assert!(reply.ok);
    assert_eq!(reply.reconciled.unwrap().spawned, 1);
    assert_eq!(pool.options(), requested);

    // Options sent to a running pool leave the current run untouched.
    let reply = handle_request(
        &pool,
        ControlRequest::StartScraping {
            max_tabs: 2,
            options: Some(RunOptions::default()),
        },
    )
    .await;
    assert!(reply.ok);
    assert_eq!(reply.reconciled.unwrap().spawned, 1);
    assert_eq!(pool.options(), requested);

    pipeline.release();
    pool.wait_until_drained().await;
}
