//! # Runner configuration.
//!
//! [`RunnerConfig`] centralizes the settings of a [`WorkerRunner`](crate::WorkerRunner):
//! how long stopping may take, how many workers may run at once, and the
//! defaults used by [`WorkerSpec::with_defaults`](crate::WorkerSpec::with_defaults).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore)
//! - `timeout = 0s` → no per-attempt timeout
//! - `grace = 0s` → stopping does not wait; workers are aborted right away

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Settings for a worker runner.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Maximum time `stop_worker`/`shutdown` wait for a cancelled worker.
    ///
    /// A worker still running after `grace` is aborted and reported as stuck.
    pub grace: Duration,

    /// Maximum number of worker attempts running at the same time (`0` = unlimited).
    pub max_concurrent: usize,

    /// Default restart policy for workers.
    pub restart: RestartPolicy,

    /// Default restart backoff for workers.
    pub backoff: BackoffPolicy,

    /// Default per-attempt timeout (`0s` = none).
    pub timeout: Duration,
}

impl RunnerConfig {
    /// Global concurrency limit, `None` when unlimited.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent > 0).then_some(self.max_concurrent)
    }

    /// Default per-attempt timeout, `None` when disabled.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        (self.timeout > Duration::ZERO).then_some(self.timeout)
    }
}

impl Default for RunnerConfig {
    /// - `grace = 10s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `restart = RestartPolicy::OnFailure`
    /// - `backoff = BackoffPolicy::default()` (constant 3s)
    /// - `timeout = 0s` (none)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            max_concurrent: 0,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            timeout: Duration::ZERO,
        }
    }
}
