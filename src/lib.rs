//! # workvisor
//!
//! **Workvisor** is the event-driven reconciliation core of a workload
//! supervisor. Producers report that workloads were tracked, untracked or
//! failed; a single dispatch loop delivers those reports in order to pluggable
//! handlers, which keep one supervised worker per workload on a keyed runner.
//!
//! The dispatch loop is packaged as a unit of supervised work for an external
//! dependency engine: it declares the resources it needs, builds its
//! collaborators from them, and reports a terminal error the engine classifies.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer          producer          producer
//!   add_events()      add_events()      add_events()
//!        └─────────────────┼─────────────────┘
//!                          ▼
//!              ┌───────────────────────┐
//!              │  EventQueue           │  rendezvous: producers wait
//!              │  (no buffering)       │  until the loop takes a batch
//!              └───────────┬───────────┘
//!                          ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Dispatcher (one per engine start)                            │
//! │  1. api.list(&[]) ─► Tracked batch ─► handlers                │
//! │  2. loop { batch ─► handler 1 ─► handler 2 ─► ... }           │
//! └──────────┬──────────────────────────────────┬─────────────────┘
//!            ▼                                  ▼
//!     ┌──────────────┐                   ┌──────────────┐
//!     │  ApiClient   │                   │    Runner    │
//!     │  (list)      │                   │  (keyed by   │
//!     └──────────────┘                   │  workload ID)│
//!                                        └──────┬───────┘
//!                                   ┌───────────┼───────────┐
//!                                   ▼           ▼           ▼
//!                              WorkerActor  WorkerActor  WorkerActor
//!                              (restart loop, backoff, timeout)
//! ```
//!
//! ### Lifecycle
//! ```text
//! EventHandlers::new()
//!   ├─► register_handler(h) ...
//!   ├─► manifolds() ─► engine
//!   │                   └─► start(resources)
//!   │                         ├─ init(api, runner) from "api-caller"
//!   │                         └─ DispatchUnit ─► Dispatcher::run(stop)
//!   │                                              NotStarted ─► Reconciling
//!   │                                                         ─► Draining
//!   │                                                         ─► Stopped
//!   ├─► add_events(events) ... (any task)
//!   └─► close()
//! ```
//!
//! ## Features
//! | Area         | Description                 | Key types / traits                              |
//! |--------------|-----------------------------|-------------------------------------------------|
//! | **Events**   | Workload events in batches. | [`Event`], [`EventKind`], [`Batch`]             |
//! | **Handlers** | React to batches.           | [`Handler`], [`HandlerFn`], [`TrackingHandler`] |
//! | **Dispatch** | Reconcile, then deliver.    | [`EventHandlers`], [`Dispatcher`]               |
//! | **Runner**   | Keyed worker supervision.   | [`Runner`], [`WorkerRunner`]                    |
//! | **Workers**  | Restart, backoff, timeout.  | [`Worker`], [`WorkerFn`], [`WorkerSpec`]        |
//! | **Engine**   | Manifolds and units.        | [`Manifold`], [`Unit`], [`DispatchUnit`]        |
//! | **Errors**   | Typed errors per layer.     | [`DispatchError`], [`RunnerError`], ...         |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use workvisor::{
//!     ApiClient, ApiClientRef, ApiError, Event, EventHandlers, Info, ResourceCatalog,
//!     TrackingHandler, Unit, WorkerError, WorkerFn, WorkerSpec,
//! };
//!
//! struct Api;
//!
//! #[async_trait]
//! impl ApiClient for Api {
//!     async fn list(&self, _ids: &[String]) -> Result<Vec<Info>, ApiError> {
//!         Ok(vec![Info::new("spam", "docker", "eggs")])
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handlers = EventHandlers::new();
//!
//!     // One status worker per tracked workload.
//!     handlers.register_handler(TrackingHandler::arc("status", |ev: &Event| {
//!         let id = format!("status/{}", ev.id);
//!         WorkerSpec::once(WorkerFn::arc(id, |ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Err::<(), _>(WorkerError::Canceled)
//!         }))
//!     }));
//!
//!     let api: ApiClientRef = Arc::new(Api);
//!     let resources = ResourceCatalog::new().with("api-caller", api);
//!     let mut unit = handlers.manifolds()["workload-event-handlers"].start(&resources)?;
//!
//!     handlers.add_events([Event::tracked("ham/1")]).await?;
//!
//!     unit.kill();
//!     unit.wait().await?;
//!     handlers.close();
//!     Ok(())
//! }
//! ```
mod api;
mod config;
mod dispatcher;
mod error;
mod event_handlers;
mod handlers;
mod manifold;
mod policies;
mod queue;
mod runner;
mod workers;
mod workload;

// ---- Public re-exports ----

pub use api::{ApiClient, ApiClientRef};
pub use config::RunnerConfig;
pub use dispatcher::{DispatchState, Dispatcher};
pub use error::{
    ApiError, DispatchError, HandlerError, ManifoldError, QueueError, RunnerError, WorkerError,
    WorkloadError,
};
pub use event_handlers::EventHandlers;
pub use handlers::{Handler, HandlerFn, HandlerRef, HandlerRegistry, TrackingHandler, WorkerFactory};
pub use manifold::{
    DispatchUnit, Manifold, ManifoldConfig, Manifolds, NewApiClient, NewRunner, Resource,
    ResourceCatalog, Resources, StartFn, Unit,
};
pub use policies::{BackoffPolicy, RestartPolicy};
pub use queue::EventQueue;
pub use runner::{Runner, RunnerRef, WorkerRunner};
pub use workers::{BoxWorkerFuture, Worker, WorkerFn, WorkerRef, WorkerSpec};
pub use workload::{Batch, Event, EventKind, Info, build_id, parse_id};
