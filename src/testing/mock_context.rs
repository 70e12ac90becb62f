//! Mock execution contexts and factories.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{
    ContextFactory, ExecutionContext, PageContext, PipelineError, PoolError, Readiness,
    ScrapedPage, WorkerId,
};

#[derive(Debug, Default)]
struct FactoryInner {
    created: AtomicUsize,
    closed: AtomicUsize,
    attempts: AtomicUsize,
    fail_remaining: AtomicUsize,
    fail_all: AtomicBool,
    create_delay: Mutex<Duration>,
}

/// Context factory handing out [`MockContext`]s.
///
/// Clones share counters, so a test can keep one clone while the pool owns
/// another.
///
/// ```rust,ignore
/// let contexts = MockContextFactory::new();
/// contexts.fail_next(1);
/// let pool = PoolController::new(config, source, contexts.clone(), pipeline, spawner)?;
/// pool.start(3, RunOptions::default()).await?;
/// assert_eq!(contexts.created(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockContextFactory {
    inner: Arc<FactoryInner>,
}

impl MockContextFactory {
    /// Create a factory that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` creations.
    pub fn fail_next(&self, count: usize) {
        self.inner.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Fail every creation until switched off again.
    pub fn fail_all(&self, fail: bool) {
        self.inner.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Delay every creation by `delay`.
    pub fn set_create_delay(&self, delay: Duration) {
        *self.inner.create_delay.lock() = delay;
    }

    /// Contexts successfully created.
    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }

    /// Contexts closed.
    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Creation attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Contexts created and not yet closed.
    pub fn open(&self) -> usize {
        self.created().saturating_sub(self.closed())
    }
}

#[async_trait]
impl ContextFactory for MockContextFactory {
    type Context = MockContext;

    async fn create(&self, worker: WorkerId) -> Result<MockContext, PoolError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.create_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let one_shot = self
            .inner
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if one_shot || self.inner.fail_all.load(Ordering::SeqCst) {
            return Err(PoolError::ContextCreation(format!(
                "mock refused context for {worker}"
            )));
        }

        self.inner.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockContext {
            worker,
            factory: Arc::clone(&self.inner),
            closed: false,
        })
    }
}

/// Execution context produced by [`MockContextFactory`].
#[derive(Debug)]
pub struct MockContext {
    worker: WorkerId,
    factory: Arc<FactoryInner>,
    closed: bool,
}

impl MockContext {
    /// Worker this context was created for.
    pub const fn worker(&self) -> WorkerId {
        self.worker
    }
}

#[async_trait]
impl ExecutionContext for MockContext {
    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.factory.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Default)]
struct PageLog {
    visited: Vec<String>,
    downloads: Vec<String>,
    probes: usize,
    closed: usize,
}

/// Scriptable [`PageContext`].
///
/// Probe results are served in order; the last one repeats once the script
/// runs out. An empty script reports "neither challenged nor ready".
#[derive(Debug, Clone)]
pub struct MockPage {
    script: VecDeque<Result<Readiness, PipelineError>>,
    last: Result<Readiness, PipelineError>,
    page: ScrapedPage,
    fail_navigation: bool,
    fail_extraction: bool,
    fail_download: bool,
    log: Arc<Mutex<PageLog>>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self {
            script: VecDeque::new(),
            last: Ok(Readiness::default()),
            page: ScrapedPage::default(),
            fail_navigation: false,
            fail_extraction: false,
            fail_download: false,
            log: Arc::new(Mutex::new(PageLog::default())),
        }
    }
}

impl MockPage {
    /// A page that is ready on the first probe and extracts `page`.
    #[must_use]
    pub fn ready(page: ScrapedPage) -> Self {
        Self::default()
            .with_probes([Ok(Readiness {
                challenged: false,
                content_ready: true,
            })])
            .with_page(page)
    }

    /// Script the probe results.
    #[must_use]
    pub fn with_probes(
        mut self,
        probes: impl IntoIterator<Item = Result<Readiness, PipelineError>>,
    ) -> Self {
        self.script = probes.into_iter().collect();
        self
    }

    /// Set the extraction result.
    #[must_use]
    pub fn with_page(mut self, page: ScrapedPage) -> Self {
        self.page = page;
        self
    }

    /// Make navigation fail.
    #[must_use]
    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// Make extraction fail.
    #[must_use]
    pub fn failing_extraction(mut self) -> Self {
        self.fail_extraction = true;
        self
    }

    /// Make downloads fail.
    #[must_use]
    pub fn failing_download(mut self) -> Self {
        self.fail_download = true;
        self
    }

    /// URLs navigated to, shared across clones.
    pub fn visited(&self) -> Vec<String> {
        self.log.lock().visited.clone()
    }

    /// URLs downloaded, shared across clones.
    pub fn downloads(&self) -> Vec<String> {
        self.log.lock().downloads.clone()
    }

    /// Number of probes performed, shared across clones.
    pub fn probe_count(&self) -> usize {
        self.log.lock().probes
    }

    /// Number of times a clone of this page was closed.
    pub fn close_count(&self) -> usize {
        self.log.lock().closed
    }
}

#[async_trait]
impl ExecutionContext for MockPage {
    async fn close(&mut self) {
        self.log.lock().closed += 1;
    }
}

#[async_trait]
impl PageContext for MockPage {
    async fn navigate(&mut self, url: &str) -> Result<(), PipelineError> {
        self.log.lock().visited.push(url.to_string());
        if self.fail_navigation {
            return Err(PipelineError::Navigation(format!("mock refused {url}")));
        }
        Ok(())
    }

    async fn probe(&mut self) -> Result<Readiness, PipelineError> {
        self.log.lock().probes += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last.clone()
    }

    async fn extract(&mut self) -> Result<ScrapedPage, PipelineError> {
        if self.fail_extraction {
            return Err(PipelineError::Extraction("mock table missing".into()));
        }
        Ok(self.page.clone())
    }

    async fn download(&mut self, url: &str) -> Result<String, PipelineError> {
        self.log.lock().downloads.push(url.to_string());
        if self.fail_download {
            return Err(PipelineError::Download(format!("mock lost {url}")));
        }
        let name = url.rsplit('/').next().unwrap_or("artifact");
        Ok(format!("downloads/{name}"))
    }
}

/// Context factory cloning a template [`MockPage`] for every worker.
#[derive(Debug, Clone)]
pub struct MockPageFactory {
    template: MockPage,
}

impl MockPageFactory {
    /// Hand out clones of `template`. Clones share its log.
    #[must_use]
    pub fn new(template: MockPage) -> Self {
        Self { template }
    }
}

#[async_trait]
impl ContextFactory for MockPageFactory {
    type Context = MockPage;

    async fn create(&self, _worker: WorkerId) -> Result<MockPage, PoolError> {
        Ok(self.template.clone())
    }
}
