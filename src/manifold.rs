//! # Manifold: wiring the dispatcher into a supervision engine.
//!
//! A supervision engine knows nothing about events or handlers. It sees a set
//! of named [`Manifold`]s, resolves the inputs each one declares from its own
//! [`Resources`], calls the start function, and keeps the returned [`Unit`]
//! alive: `kill` to stop it, `wait` to learn how it ended. Restart and fatal
//! classification of the terminal error are the engine's business.
//!
//! ```text
//! engine ─► Manifolds["workload-event-handlers"]
//!              ├─ inputs: ["api-caller"]
//!              └─ start(resources) ─► DispatchUnit ─► tokio::spawn(Dispatcher::run(stop))
//!                                        ├─ kill()  ─► stop.cancel()
//!                                        └─ wait()  ─► Result<(), DispatchError>
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use workvisor::{ApiClient, ApiClientRef, ApiError, Info, ResourceCatalog};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl ApiClient for Empty {
//!     async fn list(&self, _ids: &[String]) -> Result<Vec<Info>, ApiError> { Ok(Vec::new()) }
//! }
//!
//! let api: ApiClientRef = Arc::new(Empty);
//! let catalog = ResourceCatalog::new().with("api-caller", api);
//! assert!(catalog.contains("api-caller"));
//! ```

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClientRef;
use crate::config::RunnerConfig;
use crate::dispatcher::{Dispatcher, panic_info};
use crate::error::{DispatchError, ManifoldError};
use crate::runner::{RunnerRef, WorkerRunner};

/// Type-erased engine resource.
pub type Resource = Arc<dyn Any + Send + Sync>;

/// Engine-side lookup of resources by input name.
pub trait Resources: Send + Sync {
    /// Resource registered under `name`, if any.
    fn get(&self, name: &str) -> Option<Resource>;
}

/// In-memory [`Resources`] implementation.
#[derive(Clone, Default)]
pub struct ResourceCatalog {
    entries: HashMap<String, Resource>,
}

impl ResourceCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `name`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Arc::new(value));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// True if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Resources for ResourceCatalog {
    fn get(&self, name: &str) -> Option<Resource> {
        self.entries.get(name).cloned()
    }
}

impl std::fmt::Debug for ResourceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ResourceCatalog").field("entries", &names).finish()
    }
}

/// A running unit of supervised work.
#[async_trait]
pub trait Unit: Send {
    /// Asks the unit to stop. Returns immediately.
    fn kill(&self);

    /// Waits for the unit to end and returns its terminal result.
    async fn wait(&mut self) -> Result<(), DispatchError>;
}

/// Start function of a manifold.
pub type StartFn =
    Arc<dyn Fn(&dyn Resources) -> Result<Box<dyn Unit>, ManifoldError> + Send + Sync>;

/// Descriptor of one unit of supervised work.
#[derive(Clone)]
pub struct Manifold {
    inputs: Vec<String>,
    start: StartFn,
}

impl Manifold {
    /// Creates a descriptor.
    pub fn new<F>(inputs: Vec<String>, start: F) -> Self
    where
        F: Fn(&dyn Resources) -> Result<Box<dyn Unit>, ManifoldError> + Send + Sync + 'static,
    {
        Self {
            inputs,
            start: Arc::new(start),
        }
    }

    /// Names of the resources this manifold reads.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Starts the unit. Must be called from within a tokio runtime.
    pub fn start(&self, resources: &dyn Resources) -> Result<Box<dyn Unit>, ManifoldError> {
        (self.start)(resources)
    }
}

impl std::fmt::Debug for Manifold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifold").field("inputs", &self.inputs).finish()
    }
}

/// Manifolds keyed by name.
pub type Manifolds = BTreeMap<String, Manifold>;

/// [`Unit`] running one [`Dispatcher`] on a tokio task.
///
/// Dropping the unit kills it.
pub struct DispatchUnit {
    stop: CancellationToken,
    join: Option<JoinHandle<Result<(), DispatchError>>>,
}

impl DispatchUnit {
    /// Spawns `dispatcher` on the current runtime.
    pub fn spawn(dispatcher: Dispatcher) -> Self {
        let stop = CancellationToken::new();
        let join = tokio::spawn(dispatcher.run(stop.clone()));
        Self {
            stop,
            join: Some(join),
        }
    }

    /// True once the dispatch task has ended.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

#[async_trait]
impl Unit for DispatchUnit {
    fn kill(&self) {
        self.stop.cancel();
    }

    /// Later calls after the first return `Ok(())`.
    async fn wait(&mut self) -> Result<(), DispatchError> {
        match self.join.take() {
            Some(join) => join.await.map_err(join_failure)?,
            None => Ok(()),
        }
    }
}

impl Drop for DispatchUnit {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

fn join_failure(e: JoinError) -> DispatchError {
    let info = if e.is_panic() {
        panic_info(e.into_panic().as_ref())
    } else {
        "dispatch task cancelled".to_string()
    };
    DispatchError::Panicked { info }
}

/// Builds the API client from the api-caller resource; `None` if the type does not match.
pub type NewApiClient = Arc<dyn Fn(Resource) -> Option<ApiClientRef> + Send + Sync>;

/// Builds the runner bound when the api-caller resource is present.
pub type NewRunner = Arc<dyn Fn() -> RunnerRef + Send + Sync>;

/// How [`EventHandlers::manifolds`](crate::EventHandlers::manifolds) names
/// and wires its manifold.
#[derive(Clone)]
pub struct ManifoldConfig {
    /// Manifold name (default `"workload-event-handlers"`).
    pub name: String,
    /// Name of the API-caller input (default `"api-caller"`).
    pub api_caller_name: String,
    /// API client factory (default: the resource must be an [`ApiClientRef`]).
    pub new_api_client: NewApiClient,
    /// Runner factory (default: `WorkerRunner::new(RunnerConfig::default())`).
    pub new_runner: NewRunner,
}

impl ManifoldConfig {
    /// Default manifold name.
    pub const DEFAULT_NAME: &'static str = "workload-event-handlers";
    /// Default API-caller input name.
    pub const DEFAULT_API_CALLER: &'static str = "api-caller";

    /// Returns the config with another runner factory.
    pub fn with_runner<F>(mut self, f: F) -> Self
    where
        F: Fn() -> RunnerRef + Send + Sync + 'static,
    {
        self.new_runner = Arc::new(f);
        self
    }

    /// Returns the config with another API client factory.
    pub fn with_api_client<F>(mut self, f: F) -> Self
    where
        F: Fn(Resource) -> Option<ApiClientRef> + Send + Sync + 'static,
    {
        self.new_api_client = Arc::new(f);
        self
    }
}

impl Default for ManifoldConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            api_caller_name: Self::DEFAULT_API_CALLER.to_string(),
            new_api_client: Arc::new(|res: Resource| {
                res.downcast::<ApiClientRef>().ok().map(|api| (*api).clone())
            }),
            new_runner: Arc::new(|| {
                Arc::new(WorkerRunner::new(RunnerConfig::default())) as RunnerRef
            }),
        }
    }
}

impl std::fmt::Debug for ManifoldConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifoldConfig")
            .field("name", &self.name)
            .field("api_caller_name", &self.api_caller_name)
            .finish_non_exhaustive()
    }
}
