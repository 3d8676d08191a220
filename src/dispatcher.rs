//! # Dispatcher: reconciliation, then the drain loop.
//!
//! ```text
//! run(stop)
//!   ├─► Reconciling: api.list(&[]) ─► [Tracked(info.id()) ...] ─► every handler
//!   ├─► Draining:    loop {
//!   │                  queue.next_until(stop) ─► None ─► break
//!   │                  batch ─► handler 1 ─► handler 2 ─► ... (sequential)
//!   │                }
//!   └─► Stopped
//! ```
//!
//! ## Rules
//! - The handler list is fixed when the dispatcher is built.
//! - The listing batch is always delivered, even when empty, and always
//!   before the first queued batch.
//! - The first handler error or panic ends the loop; handlers after the
//!   failing one do not see that batch.
//! - `stop` interrupts the listing call and the wait for a batch. A batch
//!   already taken from the queue is delivered to every handler first.
//! - A closed queue or a fired `stop` ends the loop with `Ok(())`.
//! - A runner being replaced is shut down before listing starts, so a
//!   workload never has workers in two runners at once.
//! - The phase reads `Stopped` once the loop is gone, even if its task was
//!   aborted.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClientRef;
use crate::error::DispatchError;
use crate::handlers::HandlerRef;
use crate::queue::EventQueue;
use crate::runner::RunnerRef;
use crate::workload::{Batch, Event};

/// Phase of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchState {
    /// No loop has run yet.
    #[default]
    NotStarted,
    /// Listing workloads and delivering the initial batch.
    Reconciling,
    /// Taking batches from the queue.
    Draining,
    /// The loop ended (cleanly or with an error).
    Stopped,
}

impl DispatchState {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchState::NotStarted => "not_started",
            DispatchState::Reconciling => "reconciling",
            DispatchState::Draining => "draining",
            DispatchState::Stopped => "stopped",
        }
    }

    /// True while a loop is reconciling or draining.
    pub fn is_active(&self) -> bool {
        matches!(self, DispatchState::Reconciling | DispatchState::Draining)
    }
}

/// Marks the loop `Stopped` when dropped.
struct StoppedOnDrop(Arc<watch::Sender<DispatchState>>);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.send_replace(DispatchState::Stopped);
    }
}

/// One run of the reconciliation and dispatch loop.
pub struct Dispatcher {
    handlers: Arc<[HandlerRef]>,
    queue: EventQueue,
    api: ApiClientRef,
    runner: RunnerRef,
    retired: Option<RunnerRef>,
    state: Arc<watch::Sender<DispatchState>>,
}

impl Dispatcher {
    /// Creates a dispatcher with its own state channel.
    pub fn new(
        handlers: Arc<[HandlerRef]>,
        queue: EventQueue,
        api: ApiClientRef,
        runner: RunnerRef,
    ) -> Self {
        let (state, _) = watch::channel(DispatchState::NotStarted);
        Self::with_state(handlers, queue, api, runner, Arc::new(state))
    }

    pub(crate) fn with_state(
        handlers: Arc<[HandlerRef]>,
        queue: EventQueue,
        api: ApiClientRef,
        runner: RunnerRef,
        state: Arc<watch::Sender<DispatchState>>,
    ) -> Self {
        Self {
            handlers,
            queue,
            api,
            runner,
            retired: None,
            state,
        }
    }

    /// Shuts `runner` down before reconciliation starts.
    pub(crate) fn retiring(mut self, runner: RunnerRef) -> Self {
        self.retired = Some(runner);
        self
    }

    /// Current phase.
    pub fn state(&self) -> DispatchState {
        *self.state.borrow()
    }

    /// Watches phase changes.
    pub fn subscribe(&self) -> watch::Receiver<DispatchState> {
        self.state.subscribe()
    }

    /// Number of handlers this dispatcher delivers to.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Runs until the queue closes, `stop` fires, or a step fails.
    pub async fn run(mut self, stop: CancellationToken) -> Result<(), DispatchError> {
        let _stopped = StoppedOnDrop(self.state.clone());
        self.state.send_replace(DispatchState::Reconciling);
        info!(handlers = self.handlers.len(), "dispatch loop started");

        if let Some(old) = self.retired.take() {
            if let Err(e) = old.shutdown().await {
                warn!(reason = e.as_label(), error = %e, "previous runner did not stop cleanly");
            }
        }

        let res = self.reconcile_and_drain(&stop).await;
        match &res {
            Ok(()) => info!(stopped = stop.is_cancelled(), "dispatch loop stopped"),
            Err(e) => warn!(reason = e.as_label(), error = ?e, "dispatch loop failed"),
        }
        res
    }

    async fn reconcile_and_drain(&self, stop: &CancellationToken) -> Result<(), DispatchError> {
        let Some(initial) = self.list(stop).await? else {
            return Ok(());
        };
        debug!(events = initial.len(), "reconciliation batch");
        self.dispatch(initial).await?;

        self.state.send_replace(DispatchState::Draining);
        while let Some(batch) = self.queue.next_until(stop).await {
            debug!(events = batch.len(), "batch received");
            self.dispatch(batch).await?;
        }
        Ok(())
    }

    /// Lists every workload as one `Tracked` batch; `None` if stopped first.
    async fn list(&self, stop: &CancellationToken) -> Result<Option<Batch>, DispatchError> {
        let infos = tokio::select! {
            biased;
            _ = stop.cancelled() => return Ok(None),
            res = self.api.list(&[]) => res.map_err(DispatchError::List)?,
        };
        Ok(Some(infos.iter().map(|info| Event::tracked(info.id())).collect()))
    }

    async fn dispatch(&self, batch: Batch) -> Result<(), DispatchError> {
        for handler in self.handlers.iter() {
            let fut = handler.handle(batch.clone(), self.api.clone(), self.runner.clone());
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    return Err(DispatchError::Handler {
                        handler: handler.name().to_string(),
                        source,
                    });
                }
                Err(payload) => {
                    return Err(DispatchError::HandlerPanicked {
                        handler: handler.name().to_string(),
                        info: panic_info(payload.as_ref()),
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.len())
            .field("queue", &self.queue)
            .field("state", &self.state())
            .finish()
    }
}

pub(crate) fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time;

    use crate::api::ApiClient;
    use crate::config::RunnerConfig;
    use crate::error::{ApiError, HandlerError};
    use crate::handlers::HandlerFn;
    use crate::runner::WorkerRunner;
    use crate::workload::Info;

    struct Listing(Result<Vec<Info>, ApiError>);

    #[async_trait]
    impl ApiClient for Listing {
        async fn list(&self, _ids: &[String]) -> Result<Vec<Info>, ApiError> {
            self.0.clone()
        }
    }

    type Seen = Arc<Mutex<Vec<(String, Vec<String>)>>>;

    fn recorder(name: &'static str, seen: Seen) -> HandlerRef {
        HandlerFn::arc(name, move |batch: Batch, _api: ApiClientRef, _runner: RunnerRef| {
            let seen = seen.clone();
            async move {
                let ids = batch.iter().map(|ev| ev.id.clone()).collect();
                seen.lock().unwrap().push((name.to_string(), ids));
                Ok::<(), HandlerError>(())
            }
        })
    }

    fn dispatcher(
        listing: Result<Vec<Info>, ApiError>,
        handlers: Vec<HandlerRef>,
        queue: &EventQueue,
    ) -> Dispatcher {
        Dispatcher::new(
            handlers.into(),
            queue.clone(),
            Arc::new(Listing(listing)),
            Arc::new(WorkerRunner::new(RunnerConfig::default())),
        )
    }

    #[tokio::test]
    async fn listing_is_delivered_before_queued_batches() {
        let seen: Seen = Arc::default();
        let queue = EventQueue::new();
        let d = dispatcher(
            Ok(vec![Info::new("spam", "docker", "eggs")]),
            vec![recorder("a", seen.clone()), recorder("b", seen.clone())],
            &queue,
        );
        let mut state = d.subscribe();
        let loop_ = tokio::spawn(d.run(CancellationToken::new()));

        queue.push(vec![Event::untracked("spam/eggs")].into()).await.unwrap();
        state.wait_for(|s| *s == DispatchState::Draining).await.unwrap();
        queue.close();

        assert_eq!(loop_.await.unwrap(), Ok(()));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("a".to_string(), vec!["spam/eggs".to_string()]),
                ("b".to_string(), vec!["spam/eggs".to_string()]),
                ("a".to_string(), vec!["spam/eggs".to_string()]),
                ("b".to_string(), vec!["spam/eggs".to_string()]),
            ]
        );
        assert_eq!(*state.borrow(), DispatchState::Stopped);
    }

    #[tokio::test]
    async fn empty_listing_still_reaches_handlers() {
        let seen: Seen = Arc::default();
        let queue = EventQueue::new();
        queue.close();
        let d = dispatcher(Ok(Vec::new()), vec![recorder("a", seen.clone())], &queue);

        assert_eq!(d.run(CancellationToken::new()).await, Ok(()));
        assert_eq!(*seen.lock().unwrap(), vec![("a".to_string(), Vec::<String>::new())]);
    }

    #[tokio::test]
    async fn listing_failure_ends_the_loop() {
        let seen: Seen = Arc::default();
        let queue = EventQueue::new();
        let down = ApiError::Unavailable { reason: "connection refused".into() };
        let d = dispatcher(Err(down.clone()), vec![recorder("a", seen.clone())], &queue);

        assert_eq!(d.run(CancellationToken::new()).await, Err(DispatchError::List(down)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handler_error_skips_later_handlers() {
        let seen: Seen = Arc::default();
        let queue = EventQueue::new();
        let failing = HandlerFn::arc("failing", |_b: Batch, _a: ApiClientRef, _r: RunnerRef| async {
            Err::<(), _>(HandlerError::fail("boom"))
        });
        let d = dispatcher(Ok(Vec::new()), vec![failing, recorder("after", seen.clone())], &queue);

        let err = d.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err,
            DispatchError::Handler {
                handler: "failing".into(),
                source: HandlerError::fail("boom"),
            }
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handler_panic_is_reported() {
        let queue = EventQueue::new();
        let panicking =
            HandlerFn::arc("panicking", |_b: Batch, _a: ApiClientRef, _r: RunnerRef| async {
                if true {
                    panic!("handler exploded");
                }
                Ok::<(), HandlerError>(())
            });
        let d = dispatcher(Ok(Vec::new()), vec![panicking], &queue);

        let err = d.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err,
            DispatchError::HandlerPanicked {
                handler: "panicking".into(),
                info: "handler exploded".into(),
            }
        );
    }

    #[tokio::test]
    async fn stop_while_waiting_is_a_clean_exit() {
        let queue = EventQueue::new();
        let d = dispatcher(Ok(Vec::new()), Vec::new(), &queue);
        let mut state = d.subscribe();
        let stop = CancellationToken::new();
        let loop_ = tokio::spawn(d.run(stop.clone()));

        state.wait_for(|s| *s == DispatchState::Draining).await.unwrap();
        stop.cancel();

        let res = time::timeout(Duration::from_secs(1), loop_).await.unwrap().unwrap();
        assert_eq!(res, Ok(()));
        assert!(!queue.is_closed());
    }

    #[tokio::test]
    async fn replaced_runner_is_shut_down_before_listing() {
        use crate::error::WorkerError;
        use crate::runner::Runner;
        use crate::workers::{WorkerFn, WorkerSpec};

        let old = Arc::new(WorkerRunner::new(RunnerConfig::default()));
        let parked = WorkerSpec::once(WorkerFn::arc("parked", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<(), _>(WorkerError::Canceled)
        }));
        old.start_worker("spam/eggs", parked).await.unwrap();

        let watched = old.clone();
        let seen_running = Arc::new(Mutex::new(None));
        let seen = seen_running.clone();
        let check = HandlerFn::arc("check", move |_b: Batch, _a: ApiClientRef, _r: RunnerRef| {
            let old = watched.clone();
            let seen = seen.clone();
            async move {
                let running = old.running().await;
                *seen.lock().unwrap() = Some(running);
                Ok::<(), HandlerError>(())
            }
        });

        let queue = EventQueue::new();
        queue.close();
        let d = dispatcher(Ok(Vec::new()), vec![check], &queue).retiring(old.clone());

        assert_eq!(d.run(CancellationToken::new()).await, Ok(()));
        assert_eq!(*seen_running.lock().unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn aborted_loop_still_reads_stopped() {
        let queue = EventQueue::new();
        let stuck = HandlerFn::arc("stuck", |_b: Batch, _a: ApiClientRef, _r: RunnerRef| async {
            std::future::pending::<()>().await;
            Ok::<(), HandlerError>(())
        });
        let d = dispatcher(Ok(Vec::new()), vec![stuck], &queue);
        let mut state = d.subscribe();
        let loop_ = tokio::spawn(d.run(CancellationToken::new()));

        state.wait_for(|s| *s == DispatchState::Reconciling).await.unwrap();
        loop_.abort();
        assert!(loop_.await.unwrap_err().is_cancelled());
        assert_eq!(*state.borrow(), DispatchState::Stopped);
    }
}
