//! # Worker specification.
//!
//! [`WorkerSpec`] tells the runner how to supervise a worker: which restart
//! policy applies, how restarts back off, and how long one attempt may run.
//! Build one explicitly with [`WorkerSpec::new`] or inherit the runner-wide
//! defaults with [`WorkerSpec::with_defaults`].

use std::time::Duration;

use crate::config::RunnerConfig;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::workers::worker::WorkerRef;

/// Worker plus its supervision parameters.
#[derive(Clone)]
pub struct WorkerSpec {
    worker: WorkerRef,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    timeout: Option<Duration>,
}

impl WorkerSpec {
    /// Creates a spec with explicit parameters (`timeout = None` means no limit).
    pub fn new(
        worker: WorkerRef,
        restart: RestartPolicy,
        backoff: BackoffPolicy,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            worker,
            restart,
            backoff,
            timeout,
        }
    }

    /// Creates a spec inheriting restart/backoff/timeout from the runner config.
    pub fn with_defaults(worker: WorkerRef, cfg: &RunnerConfig) -> Self {
        Self {
            worker,
            restart: cfg.restart,
            backoff: cfg.backoff,
            timeout: cfg.default_timeout(),
        }
    }

    /// Runs the worker once, never restarting it.
    pub fn once(worker: WorkerRef) -> Self {
        Self::new(worker, RestartPolicy::Never, BackoffPolicy::default(), None)
    }

    /// The worker.
    pub fn worker(&self) -> &WorkerRef {
        &self.worker
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        self.worker.name()
    }

    /// Restart policy.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Backoff policy.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Per-attempt timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the spec with another restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns the spec with another backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the spec with another per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("worker", &self.worker.name())
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .field("timeout", &self.timeout)
            .finish()
    }
}
