//! Readiness-gated scrape pipeline.
//!
//! Sequence per item: navigate, probe until the page is either ready or shows
//! an anti-automation challenge, optionally wait for the challenge to clear,
//! extract, download the historical data when asked, then persist every
//! category.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::poll::{poll_until, PollOutcome};
use super::PipelineError;
use crate::config::{PoolConfig, RetryPolicy, RunOptions, ITEM_PLACEHOLDER};
use crate::core::record::{
    Category, HistoricalArtifact, PersistRecord, Persistence, ScrapedPage,
};
use crate::core::{ExecutionContext, ProcessingPipeline, WorkItem};

/// One readiness probe of a loaded page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    /// The page is showing an anti-automation challenge.
    pub challenged: bool,
    /// The expected content is present.
    pub content_ready: bool,
}

impl Readiness {
    /// Either outcome is definitive; anything else is worth another probe.
    #[must_use]
    pub const fn is_definitive(&self) -> bool {
        self.challenged || self.content_ready
    }
}

/// An execution context that can load and inspect pages.
#[async_trait]
pub trait PageContext: ExecutionContext {
    /// Load `url` and wait for the load to complete.
    async fn navigate(&mut self, url: &str) -> Result<(), PipelineError>;

    /// Inspect the loaded page once.
    async fn probe(&mut self) -> Result<Readiness, PipelineError>;

    /// Extract structured data from the ready page.
    async fn extract(&mut self) -> Result<ScrapedPage, PipelineError>;

    /// Save the file behind `url` locally and return its path.
    async fn download(&mut self, url: &str) -> Result<String, PipelineError>;
}

/// Pipeline that navigates to `page_url_template` for each item, waits for the
/// content to be ready and persists what it extracts.
#[derive(Clone)]
pub struct ReadinessPipeline {
    persistence: Arc<dyn Persistence>,
    page_url_template: String,
    readiness: RetryPolicy,
    challenge: RetryPolicy,
}

impl ReadinessPipeline {
    /// Create a pipeline with explicit policies.
    pub fn new(
        persistence: Arc<dyn Persistence>,
        page_url_template: impl Into<String>,
        readiness: RetryPolicy,
        challenge: RetryPolicy,
    ) -> Self {
        Self {
            persistence,
            page_url_template: page_url_template.into(),
            readiness,
            challenge,
        }
    }

    /// Create a pipeline from pool configuration.
    pub fn from_config(config: &PoolConfig, persistence: Arc<dyn Persistence>) -> Self {
        Self::new(
            persistence,
            config.page_url_template.clone(),
            config.readiness,
            config.challenge,
        )
    }

    /// Page URL for `item`.
    pub fn page_url(&self, item: &impl std::fmt::Display) -> String {
        self.page_url_template
            .replace(ITEM_PLACEHOLDER, &item.to_string())
    }

    async fn check_readiness<C: PageContext>(&self, ctx: &mut C) -> Readiness {
        let outcome = poll_until(
            self.readiness,
            false,
            ctx,
            |c: &mut C| c.probe(),
            Readiness::is_definitive,
        )
        .await;
        match outcome {
            PollOutcome::Satisfied { value, attempt } => {
                debug!(attempt, ?value, "readiness settled");
                value
            }
            PollOutcome::Exhausted(last) => {
                debug!(
                    attempts = self.readiness.max_attempts,
                    "readiness attempts exhausted"
                );
                last.unwrap_or_default()
            }
        }
    }

    async fn wait_for_challenge<C: PageContext>(&self, ctx: &mut C) -> Result<(), PipelineError> {
        let outcome = poll_until(
            self.challenge,
            true,
            ctx,
            |c: &mut C| c.probe(),
            |r: &Readiness| r.content_ready,
        )
        .await;
        match outcome {
            PollOutcome::Satisfied { attempt, .. } => {
                info!(attempt, "challenge cleared");
                Ok(())
            }
            PollOutcome::Exhausted(_) => Err(PipelineError::ChallengeNotCleared {
                attempts: self.challenge.max_attempts,
            }),
        }
    }

    async fn download_artifact<C: PageContext>(
        ctx: &mut C,
        page: &ScrapedPage,
        options: &RunOptions,
    ) -> Result<Option<HistoricalArtifact>, PipelineError> {
        let Some(url) = page.historical_download_url.as_ref().filter(|_| options.persist_artifacts)
        else {
            return Ok(None);
        };
        let file_path = ctx.download(url).await?;
        debug!(%url, %file_path, "historical data downloaded");
        Ok(Some(HistoricalArtifact {
            download_url: url.clone(),
            file_path,
        }))
    }

    async fn persist(
        &self,
        item: &str,
        page: &ScrapedPage,
        artifact: Option<HistoricalArtifact>,
        mut first_error: Option<PipelineError>,
    ) -> Result<(), PipelineError> {
        let mut records = vec![
            PersistRecord::new(item, Category::Transactions, &page.transactions)?,
            PersistRecord::new(item, Category::DirectorInterests, &page.director_interests)?,
        ];
        if let Some(artifact) = artifact {
            records.push(PersistRecord::new(item, Category::HistoricalData, &artifact)?);
        }

        for record in records {
            let category = record.category;
            match self.persistence.save(record).await {
                Ok(()) => debug!(%category, "record saved"),
                Err(e) => {
                    warn!(%category, error = %e, "failed to save record");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl<I, C> ProcessingPipeline<I, C> for ReadinessPipeline
where
    I: WorkItem,
    C: PageContext,
{
    async fn process(
        &self,
        item: &I,
        ctx: &mut C,
        options: &RunOptions,
    ) -> Result<(), PipelineError> {
        let url = self.page_url(item);
        debug!(%item, %url, "navigating");
        ctx.navigate(&url).await?;

        let mut readiness = self.check_readiness(ctx).await;
        if readiness.challenged && !readiness.content_ready {
            info!(%item, "challenge detected, waiting for content");
            self.wait_for_challenge(ctx).await?;
            readiness.content_ready = true;
        }
        if !readiness.content_ready {
            return Err(PipelineError::ContentMissing);
        }

        let page = ctx.extract().await?;
        info!(
            %item,
            transactions = page.transactions.len(),
            director_interests = page.director_interests.len(),
            "page extracted"
        );
        // A failed download still lets the tables through.
        let (artifact, download_error) = match Self::download_artifact(ctx, &page, options).await {
            Ok(artifact) => (artifact, None),
            Err(e) => {
                warn!(%item, error = %e, "historical data download failed");
                (None, Some(e))
            }
        };
        self.persist(&item.to_string(), &page, artifact, download_error)
            .await
    }
}
