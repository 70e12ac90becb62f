//! Builder assembling a [`PoolController`] from its collaborators.

use std::sync::Arc;

use crate::config::PoolConfig;
use crate::core::{
    ContextFactory, ItemSource, PageContext, PoolController, PoolError, ProcessingPipeline,
    ReadinessPipeline, Spawn, WorkItem,
};
use crate::infra::{HttpItemSource, HttpPersistence};
use crate::runtime::TokioSpawner;

/// Collects the pieces of a pool and validates them on [`PoolBuilder::build`].
///
/// ```rust,ignore
/// let pool = PoolBuilder::new(PoolConfig::from_env()?)
///     .source(StaticItemSource::new(["BHP".to_string()]))
///     .contexts(MyBrowser::new())
///     .pipeline(my_pipeline)
///     .spawner(TokioSpawner::current()?)
///     .build()?;
/// ```
pub struct PoolBuilder<I, F, P, S = TokioSpawner>
where
    I: WorkItem,
{
    config: PoolConfig,
    source: Option<Arc<dyn ItemSource<I>>>,
    contexts: Option<F>,
    pipeline: Option<P>,
    spawner: Option<S>,
}

impl<I, F, P, S> PoolBuilder<I, F, P, S>
where
    I: WorkItem,
    F: ContextFactory,
    P: ProcessingPipeline<I, F::Context>,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Start from `config`.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            source: None,
            contexts: None,
            pipeline: None,
            spawner: None,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the item source.
    #[must_use]
    pub fn source(mut self, source: impl ItemSource<I>) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Set an item source shared with other owners.
    #[must_use]
    pub fn shared_source(mut self, source: Arc<dyn ItemSource<I>>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the execution context factory.
    #[must_use]
    pub fn contexts(mut self, factory: F) -> Self {
        self.contexts = Some(factory);
        self
    }

    /// Set the processing pipeline.
    #[must_use]
    pub fn pipeline(mut self, pipeline: P) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the spawner used for worker loops.
    #[must_use]
    pub fn spawner(mut self, spawner: S) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Validate and assemble the controller.
    ///
    /// # Errors
    ///
    /// [`PoolError::MissingComponent`] when a collaborator was not set, or
    /// [`PoolError::InvalidConfig`] when the configuration does not validate.
    pub fn build(self) -> Result<PoolController<I, F, P, S>, PoolError> {
        let source = self.source.ok_or(PoolError::MissingComponent("item source"))?;
        let contexts = self
            .contexts
            .ok_or(PoolError::MissingComponent("context factory"))?;
        let pipeline = self.pipeline.ok_or(PoolError::MissingComponent("pipeline"))?;
        let spawner = self.spawner.ok_or(PoolError::MissingComponent("spawner"))?;
        PoolController::new(self.config, source, contexts, pipeline, spawner)
    }
}

/// Wire the scrape deployment: tickers from `config.source_url`, results to
/// `config.persistence_url`, pages processed by a [`ReadinessPipeline`] on
/// the current tokio runtime.
///
/// # Errors
///
/// Fails when the configuration is invalid, an HTTP client cannot be built,
/// or no tokio runtime is running.
pub fn build_scrape_pool<F>(
    config: PoolConfig,
    contexts: F,
) -> Result<PoolController<String, F, ReadinessPipeline, TokioSpawner>, PoolError>
where
    F: ContextFactory,
    F::Context: PageContext,
{
    config.validate().map_err(PoolError::InvalidConfig)?;
    let source = HttpItemSource::from_config(&config)?;
    let persistence = Arc::new(HttpPersistence::from_config(&config)?);
    let pipeline = ReadinessPipeline::from_config(&config, persistence);
    PoolBuilder::new(config)
        .source(source)
        .contexts(contexts)
        .pipeline(pipeline)
        .spawner(TokioSpawner::current()?)
        .build()
}
