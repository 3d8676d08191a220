//! # Closure-backed worker.
//!
//! [`WorkerFn`] wraps `F: Fn(CancellationToken) -> Fut` and calls it once per
//! attempt, so restarts never share hidden state. Shared state goes into an
//! explicit `Arc` captured by the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use workvisor::{WorkerError, WorkerFn, WorkerRef};
//!
//! let w: WorkerRef = WorkerFn::arc("status/spam/eggs", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Err::<(), _>(WorkerError::Canceled)
//! });
//! assert_eq!(w.name(), "status/spam/eggs");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::workers::worker::{BoxWorkerFuture, Worker};

/// Worker backed by a closure producing one future per attempt.
pub struct WorkerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkerFn<F> {
    /// Creates a closure-backed worker.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the worker behind an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxWorkerFuture {
        Box::pin((self.f)(ctx))
    }
}
