//! # Event handlers.
//!
//! A handler reacts to one batch of workload events at a time. The dispatcher
//! calls every registered handler in registration order and passes the bound
//! API client and runner along with the batch.
//!
//! - [`Handler`] is the extension point (async trait object).
//! - [`HandlerFn`] adapts a closure.
//! - [`HandlerRegistry`] keeps the ordered list the dispatcher snapshots.
//! - [`TrackingHandler`] starts a worker per tracked workload and stops it
//!   when the workload is untracked or failed.

mod handler;
mod handler_fn;
mod registry;
mod tracking;

pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
pub use registry::HandlerRegistry;
pub use tracking::{TrackingHandler, WorkerFactory};
