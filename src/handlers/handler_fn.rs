//! # Closure-backed handler.
//!
//! ## Example
//! ```rust
//! use workvisor::{ApiClientRef, Batch, Handler, HandlerError, HandlerFn, HandlerRef, RunnerRef};
//!
//! let h: HandlerRef = HandlerFn::arc(
//!     "count",
//!     |batch: Batch, _api: ApiClientRef, _runner: RunnerRef| async move {
//!         let _n = batch.len();
//!         Ok::<(), HandlerError>(())
//!     },
//! );
//! assert_eq!(h.name(), "count");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::ApiClientRef;
use crate::error::HandlerError;
use crate::handlers::handler::Handler;
use crate::runner::RunnerRef;
use crate::workload::Batch;

/// Handler backed by a closure producing one future per batch.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a closure-backed handler.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler behind an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Batch, ApiClientRef, RunnerRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        batch: Batch,
        api: ApiClientRef,
        runner: RunnerRef,
    ) -> Result<(), HandlerError> {
        (self.f)(batch, api, runner).await
    }
}
