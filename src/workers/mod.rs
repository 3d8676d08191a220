//! # Workers supervised by the runner.
//!
//! - [`Worker`] async, cancellable unit of work
//! - [`WorkerFn`] closure-backed worker
//! - [`WorkerRef`] shared handle (`Arc<dyn Worker>`)
//! - [`WorkerSpec`] worker plus restart/backoff/timeout

mod spec;
mod worker;
mod worker_fn;

pub use spec::WorkerSpec;
pub use worker::{BoxWorkerFuture, Worker, WorkerRef};
pub use worker_fn::WorkerFn;
