//! # TrackingHandler: one worker per tracked workload.
//!
//! ```text
//! Tracked   ─► runner.start_worker(id, factory(event))
//! Untracked ─► runner.stop_worker(id)
//! Failed    ─► runner.stop_worker(id)
//! ```
//!
//! Starting an ID that already runs and stopping one that does not are
//! logged and skipped: listing reconciliation replays `Tracked` for workloads
//! that may already be supervised. Any other runner error fails the batch.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::ApiClientRef;
use crate::error::{HandlerError, RunnerError};
use crate::handlers::handler::Handler;
use crate::runner::RunnerRef;
use crate::workers::WorkerSpec;
use crate::workload::{Batch, Event, EventKind};

/// Builds the worker started for a tracked workload.
pub type WorkerFactory = Arc<dyn Fn(&Event) -> WorkerSpec + Send + Sync>;

/// Keeps one runner worker per tracked workload.
pub struct TrackingHandler {
    name: String,
    factory: WorkerFactory,
}

impl TrackingHandler {
    /// Creates the handler; `factory` is called once per `Tracked` event.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Event) -> WorkerSpec + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Creates the handler behind an `Arc`.
    pub fn arc<F>(name: impl Into<String>, factory: F) -> Arc<Self>
    where
        F: Fn(&Event) -> WorkerSpec + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, factory))
    }

    async fn apply(&self, ev: &Event, runner: &RunnerRef) -> Result<(), RunnerError> {
        match ev.kind {
            EventKind::Tracked => runner.start_worker(&ev.id, (self.factory)(ev)).await,
            EventKind::Untracked | EventKind::Failed => runner.stop_worker(&ev.id).await,
        }
    }
}

#[async_trait]
impl Handler for TrackingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        batch: Batch,
        _api: ApiClientRef,
        runner: RunnerRef,
    ) -> Result<(), HandlerError> {
        for ev in batch.iter() {
            match self.apply(ev, &runner).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {
                    debug!(
                        handler = %self.name,
                        event = %ev,
                        reason = e.as_label(),
                        "event skipped"
                    );
                }
                Err(e) => {
                    warn!(handler = %self.name, event = %ev, error = %e, "runner rejected event");
                    return Err(HandlerError::fail(e));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TrackingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingHandler").field("name", &self.name).finish()
    }
}
