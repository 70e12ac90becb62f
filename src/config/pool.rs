//! Pool, retry and run-option configuration structures.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix shared by every environment variable read by [`PoolConfig::from_env`].
pub const ENV_PREFIX: &str = "SCRAPE_POOL_";

/// Placeholder substituted with the item in [`PoolConfig::page_url_template`].
pub const ITEM_PLACEHOLDER: &str = "{item}";

/// Bounded polling policy: at most `max_attempts` probes, `interval_ms` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Pause between two attempts, in milliseconds.
    pub interval_ms: u64,
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
        }
    }

    /// Readiness probing after navigation: 10 attempts, 1 s apart.
    #[must_use]
    pub const fn readiness() -> Self {
        Self::new(10, 1_000)
    }

    /// Waiting for an anti-automation challenge to clear: 20 attempts, 2 s apart.
    #[must_use]
    pub const fn challenge() -> Self {
        Self::new(20, 2_000)
    }

    /// Interval as a `Duration`.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate policy values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".into());
        }
        Ok(())
    }
}

/// Per-run options supplied by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Also persist secondary artifacts (historical price data).
    pub persist_artifacts: bool,
    /// Close a worker's execution context when the queue runs dry. When false,
    /// those contexts are left open for inspection. Workers removed by
    /// shrinking always close theirs.
    pub close_contexts_on_completion: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            persist_artifacts: false,
            close_contexts_on_completion: true,
        }
    }
}

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Concurrency used when a caller starts the pool without an explicit target.
    pub target_workers: usize,
    /// Upper bound for one pipeline invocation, in seconds.
    pub item_timeout_secs: u64,
    /// Readiness probing policy.
    pub readiness: RetryPolicy,
    /// Challenge-clearing policy.
    pub challenge: RetryPolicy,
    /// Run options.
    pub options: RunOptions,
    /// Buffer size of the pool event broadcast channel.
    pub event_capacity: usize,
    /// Base URL of the item source service.
    pub source_url: String,
    /// Base URL of the persistence service.
    pub persistence_url: String,
    /// Page URL template; `{item}` is replaced with the work item.
    pub page_url_template: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            target_workers: num_cpus::get().clamp(1, 8),
            item_timeout_secs: 600,
            readiness: RetryPolicy::readiness(),
            challenge: RetryPolicy::challenge(),
            options: RunOptions::default(),
            event_capacity: 256,
            source_url: "http://127.0.0.1:5000".into(),
            persistence_url: "http://127.0.0.1:5000".into(),
            page_url_template: "https://www.marketindex.com.au/asx/{item}".into(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default worker count.
    #[must_use]
    pub fn with_target_workers(mut self, target_workers: usize) -> Self {
        self.target_workers = target_workers;
        self
    }

    /// Set the per-item timeout in seconds.
    #[must_use]
    pub fn with_item_timeout_secs(mut self, secs: u64) -> Self {
        self.item_timeout_secs = secs;
        self
    }

    /// Set the readiness probing policy.
    #[must_use]
    pub fn with_readiness(mut self, policy: RetryPolicy) -> Self {
        self.readiness = policy;
        self
    }

    /// Set the challenge-clearing policy.
    #[must_use]
    pub fn with_challenge(mut self, policy: RetryPolicy) -> Self {
        self.challenge = policy;
        self
    }

    /// Set the run options.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Set the page URL template.
    #[must_use]
    pub fn with_page_url_template(mut self, template: impl Into<String>) -> Self {
        self.page_url_template = template.into();
        self
    }

    /// Per-item timeout as a `Duration`.
    #[must_use]
    pub const fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.item_timeout_secs == 0 {
            return Err("item_timeout_secs must be greater than 0".into());
        }
        if self.event_capacity == 0 {
            return Err("event_capacity must be greater than 0".into());
        }
        if !self.page_url_template.contains(ITEM_PLACEHOLDER) {
            return Err(format!("page_url_template must contain `{ITEM_PLACEHOLDER}`"));
        }
        self.readiness
            .validate()
            .map_err(|e| format!("readiness policy invalid: {e}"))?;
        self.challenge
            .validate()
            .map_err(|e| format!("challenge policy invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a `.env` file if present, then overlay `SCRAPE_POOL_*` variables
    /// on top of the defaults.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is fine; the process environment still applies.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. The lookup is
    /// called with full variable names, e.g. `SCRAPE_POOL_TARGET_WORKERS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(v) = parse_var(&get, "TARGET_WORKERS")? {
            cfg.target_workers = v;
        }
        if let Some(v) = parse_var(&get, "ITEM_TIMEOUT_SECS")? {
            cfg.item_timeout_secs = v;
        }
        if let Some(v) = parse_var(&get, "READINESS_ATTEMPTS")? {
            cfg.readiness.max_attempts = v;
        }
        if let Some(v) = parse_var(&get, "READINESS_INTERVAL_MS")? {
            cfg.readiness.interval_ms = v;
        }
        if let Some(v) = parse_var(&get, "CHALLENGE_ATTEMPTS")? {
            cfg.challenge.max_attempts = v;
        }
        if let Some(v) = parse_var(&get, "CHALLENGE_INTERVAL_MS")? {
            cfg.challenge.interval_ms = v;
        }
        if let Some(v) = parse_var(&get, "PERSIST_ARTIFACTS")? {
            cfg.options.persist_artifacts = v;
        }
        if let Some(v) = parse_var(&get, "CLOSE_CONTEXTS")? {
            cfg.options.close_contexts_on_completion = v;
        }
        if let Some(v) = parse_var(&get, "EVENT_CAPACITY")? {
            cfg.event_capacity = v;
        }
        if let Some(v) = get("SOURCE_URL") {
            cfg.source_url = v;
        }
        if let Some(v) = get("PERSISTENCE_URL") {
            cfg.persistence_url = v;
        }
        if let Some(v) = get("PAGE_URL_TEMPLATE") {
            cfg.page_url_template = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T, G>(get: &G, name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
        })
        .transpose()
}
