//! Tests for builder modules

use std::sync::Arc;

use prometheus_scrape_pool::builders::{build_scrape_pool, PoolBuilder};
use prometheus_scrape_pool::config::{PoolConfig, RunOptions};
use prometheus_scrape_pool::core::PoolError;
use prometheus_scrape_pool::infra::StaticItemSource;
use prometheus_scrape_pool::runtime::TokioSpawner;
use prometheus_scrape_pool::testing::{
    fixtures, MockContextFactory, MockPage, MockPageFactory, MockPipeline,
};

type Builder = PoolBuilder<String, MockContextFactory, MockPipeline<String>, TokioSpawner>;

#[tokio::test]
async fn test_builder_reports_missing_components() {
    let err = Builder::new(PoolConfig::default())
        .contexts(MockContextFactory::new())
        .pipeline(MockPipeline::new())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, PoolError::MissingComponent("item source")));

    let err = Builder::new(PoolConfig::default())
        .source(StaticItemSource::new(fixtures::tickers(1)))
        .contexts(MockContextFactory::new())
        .pipeline(MockPipeline::new())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, PoolError::MissingComponent("spawner")));
}

#[tokio::test]
async fn test_builder_validates_config() {
    let err = Builder::new(PoolConfig::default())
        .config(PoolConfig::default().with_item_timeout_secs(0))
        .source(StaticItemSource::new(fixtures::tickers(1)))
        .contexts(MockContextFactory::new())
        .pipeline(MockPipeline::new())
        .spawner(TokioSpawner::current().unwrap())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
}

#[tokio::test(start_paused = true)]
async fn test_built_pool_runs() {
    let pipeline = MockPipeline::new();
    let pool = Builder::new(PoolConfig::default())
        .shared_source(Arc::new(StaticItemSource::new(fixtures::tickers(3))))
        .contexts(MockContextFactory::new())
        .pipeline(pipeline.clone())
        .spawner(TokioSpawner::current().unwrap())
        .build()
        .unwrap();

    pool.start(2, RunOptions::default()).await.unwrap();
    pool.wait_until_drained().await;
    assert_eq!(pipeline.finished().len(), 3);
}

#[tokio::test]
async fn test_build_scrape_pool_wires_http_collaborators() {
    let config = PoolConfig::default().with_target_workers(2);
    let pool = build_scrape_pool(config, MockPageFactory::new(MockPage::default())).unwrap();
    assert_eq!(pool.config().target_workers, 2);
    assert!(!pool.status().is_running);
}
