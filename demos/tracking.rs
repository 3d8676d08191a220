//! # Example: tracking
//!
//! Keep one status worker per tracked workload through the manifold wiring.
//!
//! Demonstrates how to:
//! - Register a `TrackingHandler` on `EventHandlers`.
//! - Start the dispatch unit the way a supervision engine would.
//! - Feed `Tracked`/`Untracked`/`Failed` events from a producer.
//! - Stop the unit, close the queue and shut the runner down.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► EventHandlers::new() + register_handler(TrackingHandler)
//!   ├─► manifolds()["workload-event-handlers"].start(resources)
//!   │     └─► list() ─► Tracked(spam/eggs, ham/1) ─► two status workers
//!   ├─► add_events([Tracked(bacon/2)])          ─► third worker
//!   ├─► add_events([Untracked(ham/1), Failed(spam/eggs)])
//!   │                                           ─► two workers stopped
//!   └─► kill() + wait(), close(), runner.shutdown()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=workvisor=debug cargo run --example tracking
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use workvisor::{
    ApiClient, ApiClientRef, ApiError, Event, EventHandlers, Info, ResourceCatalog, Runner,
    TrackingHandler, Unit, WorkerError, WorkerFn, WorkerSpec,
};

/// Workload API answering with a fixed inventory.
struct Inventory(Vec<Info>);

#[async_trait]
impl ApiClient for Inventory {
    async fn list(&self, _ids: &[String]) -> Result<Vec<Info>, ApiError> {
        Ok(self.0.clone())
    }
}

/// Reports the workload's status until cancelled.
fn status_worker(ev: &Event) -> WorkerSpec {
    let workload = ev.id.clone();
    let worker = WorkerFn::arc(format!("status/{workload}"), move |ctx: CancellationToken| {
        let workload = workload.clone();
        async move {
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => return Err::<(), _>(WorkerError::Canceled),
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {
                        println!("[status] {workload} ok");
                    }
                }
            }
        }
    });
    WorkerSpec::once(worker)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1) Handlers are registered before the engine starts the unit
    let handlers = EventHandlers::new();
    handlers.register_handler(TrackingHandler::arc("status", status_worker));

    // 2) What the engine would resolve for the "api-caller" input
    let api: ApiClientRef = Arc::new(Inventory(vec![
        Info::new("spam", "docker", "eggs").with_status("running"),
        Info::new("ham", "docker", "1"),
    ]));
    let resources = ResourceCatalog::new().with("api-caller", api);

    // 3) Start: reconciliation runs first, then the loop waits for batches
    let manifolds = handlers.manifolds();
    let mut unit = manifolds["workload-event-handlers"].start(&resources)?;

    // 4) Producer side: each call returns once the loop took the batch
    handlers.add_events([Event::tracked("bacon/2")]).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    handlers.add_events([Event::untracked("ham/1"), Event::failed("spam/eggs")]).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    if let Some(runner) = handlers.runner() {
        println!("[main] running: {:?}", runner.running().await);
    }

    // 5) Teardown
    unit.kill();
    unit.wait().await?;
    handlers.close();
    if let Some(runner) = handlers.runner() {
        runner.shutdown().await?;
    }
    println!("[main] done, state = {:?}", handlers.state());
    Ok(())
}
