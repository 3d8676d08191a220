//! Shared stubs for the integration tests.
//!
//! - [`StubApi`] answers `list` from a fixed result and records every call.
//! - [`RecordingHandler`] records each batch with the collaborators it got.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use workvisor::{
    ApiClient, ApiClientRef, ApiError, Batch, Event, Handler, HandlerError, Info, RunnerRef,
};

/// Installs a test-friendly tracing subscriber once (`RUST_LOG` controls the level).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `cond` every 5ms for up to 2s.
pub async fn eventually<F: FnMut() -> bool>(mut cond: F) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// API client answering `list` with a fixed result.
pub struct StubApi {
    result: Result<Vec<Info>, ApiError>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl StubApi {
    pub fn listing(infos: Vec<Info>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(infos),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: ApiError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// The `ids` argument of every `list` call so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for StubApi {
    async fn list(&self, ids: &[String]) -> Result<Vec<Info>, ApiError> {
        self.calls.lock().unwrap().push(ids.to_vec());
        self.result.clone()
    }
}

/// One recorded handler invocation.
#[derive(Clone)]
pub struct Call {
    pub events: Vec<Event>,
    pub api: ApiClientRef,
    pub runner: RunnerRef,
}

/// Handler recording every batch; optionally fails on non-empty batches.
pub struct RecordingHandler {
    name: String,
    fail_on_events: Option<HandlerError>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_on_events: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Records every batch, then fails each one that carries events.
    pub fn failing(name: &str, err: HandlerError) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_on_events: Some(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<Event>> {
        self.calls().into_iter().map(|c| c.events).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        batch: Batch,
        api: ApiClientRef,
        runner: RunnerRef,
    ) -> Result<(), HandlerError> {
        self.calls.lock().unwrap().push(Call {
            events: batch.to_vec(),
            api,
            runner,
        });
        match &self.fail_on_events {
            Some(err) if !batch.is_empty() => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

/// True if both handles point at the same API client.
pub fn same_api(a: &ApiClientRef, b: &ApiClientRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// True if both handles point at the same runner.
pub fn same_runner(a: &RunnerRef, b: &RunnerRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
