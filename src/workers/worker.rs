//! # Worker abstraction.
//!
//! A [`Worker`] is what the runner keeps alive for a workload: a status poller,
//! a log forwarder, anything async. Each attempt gets a fresh future from
//! [`Worker::spawn`] and a [`CancellationToken`] that fires when the runner
//! stops the worker or the attempt times out.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Boxed future returned by one worker attempt.
pub type BoxWorkerFuture = Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'static>>;

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// Asynchronous, cancellable unit supervised by the runner.
///
/// Implementations should watch `ctx` and return promptly once it fires,
/// preferably with `Err(WorkerError::Canceled)` or `Ok(())`.
pub trait Worker: Send + Sync + 'static {
    /// Stable, human-readable name used in logs.
    fn name(&self) -> &str;

    /// Creates the future for one attempt.
    fn spawn(&self, ctx: CancellationToken) -> BoxWorkerFuture;
}
