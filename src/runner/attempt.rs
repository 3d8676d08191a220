//! # One attempt of a worker.
//!
//! - derives a child token so a timeout cancels only this attempt
//! - applies the optional per-attempt timeout
//! - logs the outcome
//!
//! ```text
//! Ok(())            → debug "worker attempt finished"
//! Err(Canceled)     → debug "worker attempt cancelled"
//! timeout elapsed   → cancel child → Err(Timeout) → warn
//! Err(Fail/Fatal)   → warn "worker attempt failed"
//! ```

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::WorkerError;
use crate::workers::Worker;

/// Runs a single attempt of `worker` supervised under workload `id`.
pub(crate) async fn run_once(
    worker: &dyn Worker,
    id: &str,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    attempt: u32,
) -> Result<(), WorkerError> {
    let child = parent.child_token();

    let res = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, worker.spawn(child.clone())).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                Err(WorkerError::Timeout { timeout: dur })
            }
        },
        None => worker.spawn(child.clone()).await,
    };

    match &res {
        Ok(()) => debug!(workload = id, worker = worker.name(), attempt, "worker attempt finished"),
        Err(WorkerError::Canceled) => {
            debug!(workload = id, worker = worker.name(), attempt, "worker attempt cancelled")
        }
        Err(e) => warn!(
            workload = id,
            worker = worker.name(),
            attempt,
            error = %e,
            label = e.as_label(),
            "worker attempt failed"
        ),
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::WorkerFn;

    #[tokio::test]
    async fn timeout_fails_the_attempt_but_not_the_parent() {
        let w = WorkerFn::new("slow", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<(), _>(WorkerError::Canceled)
        });

        let parent = CancellationToken::new();
        let res = run_once(&w, "spam/eggs", &parent, Some(Duration::from_millis(20)), 1).await;

        assert_eq!(
            res,
            Err(WorkerError::Timeout {
                timeout: Duration::from_millis(20)
            })
        );
        assert!(!parent.is_cancelled(), "parent must not be cancelled by a timeout");
    }

    #[tokio::test]
    async fn zero_timeout_means_none() {
        let w = WorkerFn::new("quick", |_ctx: CancellationToken| async {
            Ok::<(), WorkerError>(())
        });
        let parent = CancellationToken::new();
        let res = run_once(&w, "spam/eggs", &parent, Some(Duration::ZERO), 1).await;
        assert_eq!(res, Ok(()));
    }
}
