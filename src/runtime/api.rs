//! Control protocol: the messages a control surface (popup, CLI, HTTP front
//! end) sends to a pool, and the dispatcher that applies them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RunOptions;
use crate::core::{
    ContextFactory, PoolController, PoolStats, PoolStatus, ProcessingPipeline, Reconciled, Spawn,
    WorkItem,
};

/// A control message, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Start a run with `max_tabs` workers, or retarget a running pool.
    StartScraping {
        /// Target concurrency.
        #[serde(rename = "maxTabs", alias = "max_tabs")]
        max_tabs: usize,
        /// Options for a new run. Without them an idle pool starts with the
        /// last used options. Ignored when a run is already in progress.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<RunOptions>,
    },
    /// Hold workers before their next pop.
    PauseScraping,
    /// Release paused workers, optionally after a delay.
    ResumeScraping {
        /// Delay before resuming, in milliseconds.
        #[serde(default, alias = "delay")]
        delay_ms: Option<u64>,
    },
    /// Report status.
    GetStatus,
}

impl ControlRequest {
    /// Parse a JSON control message.
    pub fn from_json(input: &str) -> Result<Self, String> {
        serde_json::from_str(input).map_err(|e| format!("invalid control message: {e}"))
    }
}

/// Reply to a [`ControlRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    /// Whether the request was applied.
    pub ok: bool,
    /// Status after the request.
    #[serde(flatten)]
    pub status: PoolStatus,
    /// Worker set changes made by the request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled: Option<Reconciled>,
    /// Utilization counters, for `get_status`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PoolStats>,
    /// Failure description when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    fn ok(status: PoolStatus) -> Self {
        Self {
            ok: true,
            status,
            reconciled: None,
            stats: None,
            error: None,
        }
    }
}

/// Apply `request` to `controller`.
///
/// Failures are reported in the response rather than returned, so a control
/// surface always gets a reply.
pub async fn handle_request<I, F, P, S>(
    controller: &PoolController<I, F, P, S>,
    request: ControlRequest,
) -> ControlResponse
where
    I: WorkItem,
    F: ContextFactory,
    P: ProcessingPipeline<I, F::Context>,
    S: Spawn + Clone + Send + Sync + 'static,
{
    match request {
        ControlRequest::StartScraping { max_tabs, options } => {
            info!(max_tabs, ?options, "start requested");
            let applied = match options {
                Some(options) => controller.start(max_tabs, options).await,
                None => controller.set_target(max_tabs).await,
            };
            match applied {
                Ok(reconciled) => ControlResponse {
                    reconciled: Some(reconciled),
                    ..ControlResponse::ok(controller.status())
                },
                Err(e) => {
                    warn!(error = %e, "start request failed");
                    ControlResponse {
                        ok: false,
                        error: Some(e.to_string()),
                        ..ControlResponse::ok(controller.status())
                    }
                }
            }
        }
        ControlRequest::PauseScraping => {
            controller.pause();
            ControlResponse::ok(controller.status())
        }
        ControlRequest::ResumeScraping { delay_ms } => {
            controller.resume(delay_ms.map(Duration::from_millis)).await;
            ControlResponse::ok(controller.status())
        }
        ControlRequest::GetStatus => ControlResponse {
            stats: Some(controller.stats()),
            ..ControlResponse::ok(controller.status())
        },
    }
}
