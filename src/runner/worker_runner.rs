//! # WorkerRunner: tokio implementation of [`Runner`].
//!
//! ## Rules
//! - The runner owns the worker handles (JoinHandle + CancellationToken).
//! - Check-and-insert (start) and remove (stop) each happen under one write
//!   lock, so [`Runner::running`] never sees a half-applied transition.
//! - A worker that ends for good (policy exhausted, fatal error) removes its
//!   own entry; a generation number keeps it from removing a newer worker
//!   started under the same ID.
//! - Dropping the runner cancels every worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::runner::Runner;
use crate::runner::actor::{WorkerActor, WorkerExit};
use crate::workers::WorkerSpec;

/// Handle to a running worker actor.
struct Handle {
    generation: u64,
    join: JoinHandle<WorkerExit>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Workers {
    map: RwLock<HashMap<String, Handle>>,
}

impl Workers {
    /// Removes `id` if it still belongs to `generation`.
    async fn forget(&self, id: &str, generation: u64) {
        let mut map = self.map.write().await;
        if map.get(id).is_some_and(|h| h.generation == generation) {
            map.remove(id);
            debug!(workload = id, "finished worker removed");
        }
    }
}

/// Keyed supervisor running each worker in its own restart loop.
pub struct WorkerRunner {
    workers: Arc<Workers>,
    cfg: RunnerConfig,
    runtime_token: CancellationToken,
    semaphore: Option<Arc<Semaphore>>,
    generation: AtomicU64,
}

impl WorkerRunner {
    /// Creates an empty runner.
    pub fn new(cfg: RunnerConfig) -> Self {
        let semaphore = cfg.concurrency_limit().map(Semaphore::new).map(Arc::new);
        Self {
            workers: Arc::new(Workers::default()),
            cfg,
            runtime_token: CancellationToken::new(),
            semaphore,
            generation: AtomicU64::new(0),
        }
    }

    /// Runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    /// True if a worker is supervised under `id`.
    pub async fn contains(&self, id: &str) -> bool {
        self.workers.map.read().await.contains_key(id)
    }

    /// Number of supervised workers.
    pub async fn len(&self) -> usize {
        self.workers.map.read().await.len()
    }

    /// True if no worker is supervised.
    pub async fn is_empty(&self) -> bool {
        self.workers.map.read().await.is_empty()
    }
}

#[async_trait]
impl Runner for WorkerRunner {
    async fn start_worker(&self, id: &str, spec: WorkerSpec) -> Result<(), RunnerError> {
        let mut map = self.workers.map.write().await;
        if map.contains_key(id) {
            return Err(RunnerError::DuplicateWorker { id: id.to_string() });
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.runtime_token.child_token();
        let worker_name = spec.name().to_string();
        let actor = WorkerActor::new(id.to_string(), spec, self.semaphore.clone());

        let token = cancel.clone();
        let key = id.to_string();
        let workers: Weak<Workers> = Arc::downgrade(&self.workers);
        let join = tokio::spawn(async move {
            let exit = actor.run(token).await;
            if exit != WorkerExit::Cancelled {
                if let Some(workers) = workers.upgrade() {
                    workers.forget(&key, generation).await;
                }
            }
            exit
        });

        map.insert(
            id.to_string(),
            Handle {
                generation,
                join,
                cancel,
            },
        );
        info!(workload = id, worker = %worker_name, "worker started");
        Ok(())
    }

    async fn stop_worker(&self, id: &str) -> Result<(), RunnerError> {
        let mut handle = self
            .workers
            .map
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RunnerError::UnknownWorker { id: id.to_string() })?;

        handle.cancel.cancel();
        match time::timeout(self.cfg.grace, &mut handle.join).await {
            Ok(joined) => {
                report_join(id, joined);
                info!(workload = id, "worker stopped");
                Ok(())
            }
            Err(_elapsed) => {
                handle.join.abort();
                warn!(
                    workload = id,
                    grace = ?self.cfg.grace,
                    "worker did not stop in time; aborted"
                );
                Err(RunnerError::GraceExceeded {
                    grace: self.cfg.grace,
                    stuck: vec![id.to_string()],
                })
            }
        }
    }

    async fn running(&self) -> Vec<String> {
        let map = self.workers.map.read().await;
        let mut ids: Vec<String> = map.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Stops every worker, waiting up to `grace` for all of them together.
    ///
    /// Workers still running afterwards are aborted and reported in
    /// [`RunnerError::GraceExceeded`]. The runner stays usable.
    async fn shutdown(&self) -> Result<(), RunnerError> {
        let handles: Vec<(String, Handle)> = self.workers.map.write().await.drain().collect();
        if handles.is_empty() {
            return Ok(());
        }
        info!(workers = handles.len(), "stopping all workers");

        for (_, h) in &handles {
            h.cancel.cancel();
        }

        let deadline = time::Instant::now() + self.cfg.grace;
        let mut stuck = Vec::new();
        for (id, mut h) in handles {
            match time::timeout_at(deadline, &mut h.join).await {
                Ok(joined) => report_join(&id, joined),
                Err(_elapsed) => {
                    h.join.abort();
                    stuck.push(id);
                }
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            stuck.sort_unstable();
            warn!(?stuck, grace = ?self.cfg.grace, "workers did not stop in time");
            Err(RunnerError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            })
        }
    }
}

impl Drop for WorkerRunner {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

fn report_join(id: &str, joined: Result<WorkerExit, tokio::task::JoinError>) {
    match joined {
        Ok(exit) => debug!(workload = id, ?exit, "worker joined"),
        Err(e) if e.is_panic() => warn!(workload = id, "worker panicked"),
        Err(_) => debug!(workload = id, "worker aborted"),
    }
}
