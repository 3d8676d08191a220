//! # WorkerActor: supervises one worker.
//!
//! ```text
//! loop {
//!   ├─► cancelled? ─► exit Cancelled
//!   ├─► acquire permit (cancellable)
//!   ├─► attempt += 1; run_once()
//!   ├─► cancelled? ─► exit Cancelled
//!   ├─► RestartPolicy::should_restart(outcome)?
//!   │     ├─ no, Fatal  ─► exit Fatal
//!   │     └─ no         ─► exit Exhausted
//!   └─► sleep(backoff.next(failures)) (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - Attempts run sequentially, never in parallel for one actor.
//! - The permit is released before the backoff sleep.
//! - `failures` counts consecutive failed attempts and resets on success.

use std::sync::Arc;

use tokio::{select, sync::Semaphore, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::runner::attempt::run_once;
use crate::workers::WorkerSpec;

/// Why an actor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// The runner cancelled the worker.
    Cancelled,
    /// The restart policy did not allow another attempt.
    Exhausted,
    /// The worker returned [`WorkerError::Fatal`].
    Fatal,
}

/// Restart loop around one worker.
pub(crate) struct WorkerActor {
    id: String,
    spec: WorkerSpec,
    semaphore: Option<Arc<Semaphore>>,
}

impl WorkerActor {
    pub(crate) fn new(id: String, spec: WorkerSpec, semaphore: Option<Arc<Semaphore>>) -> Self {
        Self { id, spec, semaphore }
    }

    /// Runs attempts until cancellation or until the restart policy gives up.
    pub(crate) async fn run(self, token: CancellationToken) -> WorkerExit {
        let mut attempt: u32 = 0;
        let mut failures: u32 = 0;

        loop {
            if token.is_cancelled() {
                return WorkerExit::Cancelled;
            }

            let permit = match &self.semaphore {
                Some(sem) => select! {
                    res = sem.clone().acquire_owned() => match res {
                        Ok(permit) => Some(permit),
                        Err(_closed) => return WorkerExit::Cancelled,
                    },
                    _ = token.cancelled() => return WorkerExit::Cancelled,
                },
                None => None,
            };

            attempt = attempt.saturating_add(1);
            debug!(
                workload = %self.id,
                worker = self.spec.name(),
                attempt,
                "worker attempt starting"
            );
            let outcome = run_once(
                self.spec.worker().as_ref(),
                &self.id,
                &token,
                self.spec.timeout(),
                attempt,
            )
            .await;
            drop(permit);

            if token.is_cancelled() {
                return WorkerExit::Cancelled;
            }

            if !self.spec.restart().should_restart(&outcome) {
                return match outcome {
                    Err(WorkerError::Fatal { error }) => {
                        warn!(workload = %self.id, attempt, %error, "worker died");
                        WorkerExit::Fatal
                    }
                    _ => {
                        info!(workload = %self.id, attempt, "worker finished");
                        WorkerExit::Exhausted
                    }
                };
            }

            let delay = match outcome {
                Ok(()) => {
                    failures = 0;
                    self.spec.backoff().next(0)
                }
                Err(_) => {
                    let delay = self.spec.backoff().next(failures);
                    failures = failures.saturating_add(1);
                    delay
                }
            };
            info!(workload = %self.id, attempt, ?delay, "worker restart scheduled");

            select! {
                _ = time::sleep(delay) => {}
                _ = token.cancelled() => return WorkerExit::Cancelled,
            }
        }
    }
}
