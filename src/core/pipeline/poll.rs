//! Bounded polling driven by a [`RetryPolicy`].

use futures::future::BoxFuture;
use tracing::trace;

use crate::config::RetryPolicy;

/// Result of [`poll_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// A probe satisfied the predicate on the given attempt (1-based).
    Satisfied {
        /// Probe value that satisfied the predicate.
        value: T,
        /// Attempt number.
        attempt: u32,
    },
    /// Every attempt was used up; holds the last successful probe value, if any.
    Exhausted(Option<T>),
}

/// Probe `subject` up to `policy.max_attempts` times until `done` accepts a value.
///
/// A probe error counts as an unsatisfying attempt. When `wait_first` is set
/// the interval is slept before every probe (challenge clearing); otherwise
/// only between probes (readiness checks).
pub async fn poll_until<S, T, E, F, D>(
    policy: RetryPolicy,
    wait_first: bool,
    subject: &mut S,
    mut probe: F,
    done: D,
) -> PollOutcome<T>
where
    S: ?Sized,
    F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, Result<T, E>>,
    D: Fn(&T) -> bool,
    E: std::fmt::Display,
{
    let mut last = None;
    for attempt in 1..=policy.max_attempts {
        if wait_first || attempt > 1 {
            tokio::time::sleep(policy.interval()).await;
        }
        match probe(subject).await {
            Ok(value) if done(&value) => return PollOutcome::Satisfied { value, attempt },
            Ok(value) => last = Some(value),
            Err(e) => trace!(attempt, error = %e, "probe failed"),
        }
    }
    PollOutcome::Exhausted(last)
}
