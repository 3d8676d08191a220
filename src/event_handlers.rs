//! # EventHandlers: the producer surface and owner of the dispatch pieces.
//!
//! ```text
//! EventHandlers::new()
//!   ├─ init(api, runner)         bind collaborators (rebinding replaces them)
//!   ├─ register_handler(h) ...   append to the registry
//!   ├─ manifolds()               engine wiring; pure, call as often as needed
//!   ├─ add_events(events)        from any task; waits for the dispatch loop
//!   └─ close()                   permanent; later add_events fail with Closed
//! ```
//!
//! ## Start function
//! The manifold's start function:
//! 1. Fails with [`ManifoldError::AlreadyRunning`] while an earlier unit is
//!    still reconciling or draining: the queue has one consumer at a time.
//! 2. If the engine provides the api-caller resource, builds the API client
//!    and a fresh runner from it and calls [`EventHandlers::init`]. The
//!    runner it replaces is shut down by the new loop before listing.
//! 3. Otherwise reuses collaborators bound earlier, or fails with
//!    [`ManifoldError::MissingInput`].
//! 4. Snapshots the handlers, spawns the dispatcher and returns its unit.
//!
//! Wait for a killed unit before starting the next one.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use workvisor::{
//!     ApiClient, ApiClientRef, ApiError, Event, EventHandlers, Info, RunnerConfig, RunnerRef,
//!     WorkerRunner,
//! };
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl ApiClient for Empty {
//!     async fn list(&self, _ids: &[String]) -> Result<Vec<Info>, ApiError> { Ok(Vec::new()) }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let handlers = EventHandlers::new();
//! let api: ApiClientRef = Arc::new(Empty);
//! let runner: RunnerRef = Arc::new(WorkerRunner::new(RunnerConfig::default()));
//! handlers.init(api, runner);
//!
//! let manifolds = handlers.manifolds();
//! assert!(manifolds.contains_key("workload-event-handlers"));
//!
//! handlers.close();
//! assert!(handlers.add_events([Event::tracked("spam/eggs")]).await.is_err());
//! # }
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use futures::Stream;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::ApiClientRef;
use crate::dispatcher::{DispatchState, Dispatcher};
use crate::error::{DispatchError, ManifoldError, QueueError};
use crate::handlers::{HandlerRef, HandlerRegistry};
use crate::manifold::{DispatchUnit, Manifold, ManifoldConfig, Manifolds, Resources, Unit};
use crate::queue::EventQueue;
use crate::runner::RunnerRef;
use crate::workload::{Batch, Event};

#[derive(Clone)]
struct Bound {
    api: ApiClientRef,
    runner: RunnerRef,
}

/// Workload event dispatcher: registry, queue and bound collaborators.
pub struct EventHandlers {
    config: ManifoldConfig,
    registry: HandlerRegistry,
    queue: EventQueue,
    bound: RwLock<Option<Bound>>,
    state: Arc<watch::Sender<DispatchState>>,
}

impl EventHandlers {
    /// Creates an empty dispatcher with the default [`ManifoldConfig`].
    pub fn new() -> Arc<Self> {
        Self::with_config(ManifoldConfig::default())
    }

    /// Creates an empty dispatcher with a custom [`ManifoldConfig`].
    pub fn with_config(config: ManifoldConfig) -> Arc<Self> {
        let (state, _) = watch::channel(DispatchState::NotStarted);
        Arc::new(Self {
            config,
            registry: HandlerRegistry::new(),
            queue: EventQueue::new(),
            bound: RwLock::new(None),
            state: Arc::new(state),
        })
    }

    /// Binds the API client and runner handed to every handler.
    ///
    /// Calling it again replaces the previous pair for dispatchers built afterwards.
    pub fn init(&self, api: ApiClientRef, runner: RunnerRef) {
        let mut bound = self.bound.write().unwrap_or_else(PoisonError::into_inner);
        *bound = Some(Bound { api, runner });
        debug!("event handlers initialized");
    }

    /// True once [`init`](Self::init) was called.
    pub fn is_initialized(&self) -> bool {
        self.bound.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Bound API client, if any.
    pub fn api_client(&self) -> Option<ApiClientRef> {
        self.bound_pair().map(|b| b.api)
    }

    /// Bound runner, if any.
    pub fn runner(&self) -> Option<RunnerRef> {
        self.bound_pair().map(|b| b.runner)
    }

    fn bound_pair(&self) -> Option<Bound> {
        self.bound.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Appends a handler. It takes effect for dispatchers built afterwards.
    pub fn register_handler(&self, handler: HandlerRef) {
        debug!(handler = handler.name(), "handler registered");
        self.registry.register(handler);
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Hands `events` to the dispatch loop as one batch.
    ///
    /// Waits until the loop takes the batch. An empty sequence returns `Ok(())`
    /// right away. Fails with [`QueueError::Closed`] once [`close`](Self::close)
    /// was called.
    pub async fn add_events(
        &self,
        events: impl IntoIterator<Item = Event>,
    ) -> Result<(), QueueError> {
        let batch: Batch = events.into_iter().collect();
        if batch.is_empty() {
            return Ok(());
        }
        self.queue.push(batch).await
    }

    /// Closes the queue for good. Idempotent.
    pub fn close(&self) {
        if !self.queue.is_closed() {
            info!("event queue closed");
        }
        self.queue.close();
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Consumes batches directly, bypassing the dispatcher.
    ///
    /// The stream ends once the queue is closed.
    pub fn batches(&self) -> impl Stream<Item = Batch> + Send + use<> {
        self.queue.batches()
    }

    /// Builds a dispatcher over the current handlers and bound collaborators.
    pub fn dispatcher(&self) -> Result<Dispatcher, DispatchError> {
        let bound = self.bound_pair().ok_or(DispatchError::NotInitialized)?;
        Ok(Dispatcher::with_state(
            self.registry.snapshot(),
            self.queue.clone(),
            bound.api,
            bound.runner,
            self.state.clone(),
        ))
    }

    /// Phase of the most recent dispatch loop.
    pub fn state(&self) -> DispatchState {
        *self.state.borrow()
    }

    /// Watches dispatch phase changes.
    pub fn watch_state(&self) -> watch::Receiver<DispatchState> {
        self.state.subscribe()
    }

    /// Manifold configuration.
    pub fn config(&self) -> &ManifoldConfig {
        &self.config
    }

    /// Engine wiring: one manifold reading the api-caller resource.
    pub fn manifolds(self: &Arc<Self>) -> Manifolds {
        let this = Arc::clone(self);
        let manifold = Manifold::new(vec![self.config.api_caller_name.clone()], move |resources| {
            this.start_unit(resources)
        });

        let mut manifolds = Manifolds::new();
        manifolds.insert(self.config.name.clone(), manifold);
        manifolds
    }

    fn start_unit(&self, resources: &dyn Resources) -> Result<Box<dyn Unit>, ManifoldError> {
        let previous = self.claim()?;
        match self.prepare(resources) {
            Ok(dispatcher) => {
                info!(
                    manifold = %self.config.name,
                    handlers = dispatcher.handler_count(),
                    "dispatch unit starting"
                );
                Ok(Box::new(DispatchUnit::spawn(dispatcher)))
            }
            Err(e) => {
                self.state.send_replace(previous);
                Err(e)
            }
        }
    }

    /// Marks a loop as starting and returns the phase it replaces.
    fn claim(&self) -> Result<DispatchState, ManifoldError> {
        let mut previous = None;
        self.state.send_if_modified(|state| {
            if state.is_active() {
                return false;
            }
            previous = Some(*state);
            *state = DispatchState::Reconciling;
            true
        });
        previous.ok_or_else(|| ManifoldError::AlreadyRunning {
            name: self.config.name.clone(),
        })
    }

    fn prepare(&self, resources: &dyn Resources) -> Result<Dispatcher, ManifoldError> {
        let input = &self.config.api_caller_name;
        let mut retired = None;
        match resources.get(input) {
            Some(resource) => {
                let api = (self.config.new_api_client)(resource)
                    .ok_or_else(|| ManifoldError::ResourceType { name: input.clone() })?;
                let runner = (self.config.new_runner)();
                retired = self.runner().filter(|old| !Arc::ptr_eq(old, &runner));
                self.init(api, runner);
            }
            None if self.is_initialized() => {
                debug!(input = %input, "input missing; reusing bound collaborators");
            }
            None => return Err(ManifoldError::MissingInput { name: input.clone() }),
        }

        let dispatcher = self.dispatcher()?;
        Ok(match retired {
            Some(old) => dispatcher.retiring(old),
            None => dispatcher,
        })
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .field("initialized", &self.is_initialized())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::api::ApiClient;
    use crate::config::RunnerConfig;
    use crate::error::ApiError;
    use crate::manifold::ResourceCatalog;
    use crate::runner::WorkerRunner;
    use crate::workload::Info;

    struct Nothing;

    #[async_trait]
    impl ApiClient for Nothing {
        async fn list(&self, _ids: &[String]) -> Result<Vec<Info>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn empty_add_is_a_no_op_even_when_closed() {
        let eh = EventHandlers::new();
        assert_eq!(eh.add_events(Vec::new()).await, Ok(()));
        eh.close();
        assert_eq!(eh.add_events(Vec::new()).await, Ok(()));
        assert_eq!(eh.add_events([Event::tracked("spam/eggs")]).await, Err(QueueError::Closed));
    }

    #[test]
    fn dispatcher_requires_init() {
        let eh = EventHandlers::new();
        assert_eq!(eh.dispatcher().unwrap_err(), DispatchError::NotInitialized);

        eh.init(Arc::new(Nothing), Arc::new(WorkerRunner::new(RunnerConfig::default())));
        assert!(eh.is_initialized());
        assert!(eh.dispatcher().is_ok());
    }

    #[test]
    fn manifolds_follow_the_config() {
        let cfg = ManifoldConfig {
            name: "events".into(),
            api_caller_name: "api".into(),
            ..ManifoldConfig::default()
        };
        let eh = EventHandlers::with_config(cfg);

        let m = eh.manifolds();
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["events"]);
        assert_eq!(m["events"].inputs(), ["api".to_string()]);
    }

    #[tokio::test]
    async fn wrong_resource_type_is_rejected() {
        let eh = EventHandlers::new();
        let catalog = ResourceCatalog::new().with(ManifoldConfig::DEFAULT_API_CALLER, 7_u8);

        let err = eh.manifolds()[ManifoldConfig::DEFAULT_NAME]
            .start(&catalog)
            .err()
            .unwrap();
        assert_eq!(err, ManifoldError::ResourceType { name: "api-caller".into() });
        assert!(!eh.is_initialized());
    }

    #[tokio::test]
    async fn failed_start_keeps_the_previous_phase() {
        let eh = EventHandlers::new();
        let err = eh.manifolds()[ManifoldConfig::DEFAULT_NAME]
            .start(&ResourceCatalog::new())
            .err()
            .unwrap();
        assert_eq!(err, ManifoldError::MissingInput { name: "api-caller".into() });
        assert_eq!(eh.state(), DispatchState::NotStarted);
    }
}
