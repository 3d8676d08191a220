//! # Workload runner: keyed supervision of workers.
//!
//! [`Runner`] is the capability handed to every handler. It keys workers by
//! workload ID so a handler reacting to `Tracked`/`Untracked` events can start
//! and stop the matching worker without keeping its own bookkeeping.
//!
//! [`WorkerRunner`] is the tokio implementation:
//! ```text
//! start_worker(id, spec) ──► RwLock<HashMap<id, Handle>>
//!                                 │
//!                                 └──► tokio::spawn(WorkerActor::run(child_token))
//!                                          loop {
//!                                            ├─► acquire permit (optional)
//!                                            ├─► run_once(worker, timeout)
//!                                            ├─► RestartPolicy::should_restart?
//!                                            │     └─ no  ─► exit, forget(id)
//!                                            └─► sleep(backoff.next(failures))
//!                                          }
//! stop_worker(id) ──► remove(id) ─► cancel ─► join (≤ grace) / abort
//! ```
//!
//! ## Conflicts
//! Starting an ID that is already running fails with
//! [`RunnerError::DuplicateWorker`]; stopping an ID that is not running fails
//! with [`RunnerError::UnknownWorker`]. Neither touches the running set.

mod actor;
mod attempt;
mod worker_runner;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RunnerError;
use crate::workers::WorkerSpec;

pub use worker_runner::WorkerRunner;

/// Shared handle to a runner.
pub type RunnerRef = Arc<dyn Runner>;

/// Keyed supervisor of workload workers.
///
/// Implementations must be safe to call concurrently; a [`Runner::running`]
/// snapshot never shows a half-applied start or stop.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Starts supervising `spec` under `id`.
    async fn start_worker(&self, id: &str, spec: WorkerSpec) -> Result<(), RunnerError>;

    /// Stops the worker supervised under `id` and waits for it to exit.
    async fn stop_worker(&self, id: &str) -> Result<(), RunnerError>;

    /// Sorted IDs of the workers currently supervised.
    async fn running(&self) -> Vec<String>;

    /// Stops every worker and waits for them, bounded by the runner's grace.
    ///
    /// Called when the runner is replaced; the runner stays usable afterwards.
    async fn shutdown(&self) -> Result<(), RunnerError>;
}
