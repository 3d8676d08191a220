//! # Handler trait.
//!
//! ## Rules
//! - Batches arrive in handoff order, one at a time; a handler never sees two
//!   batches concurrently.
//! - Returning an error stops the dispatch loop and skips the handlers after
//!   this one for the current batch. Errors that should not stop the loop
//!   must be handled inside the handler.
//! - Panics are caught and reported as `DispatchError::HandlerPanicked`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use workvisor::{ApiClientRef, Batch, Handler, HandlerError, RunnerRef};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Handler for Audit {
//!     fn name(&self) -> &str { "audit" }
//!
//!     async fn handle(
//!         &self,
//!         batch: Batch,
//!         _api: ApiClientRef,
//!         _runner: RunnerRef,
//!     ) -> Result<(), HandlerError> {
//!         for ev in batch.iter() {
//!             let _ = (ev.kind, &ev.id);
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::ApiClientRef;
use crate::error::HandlerError;
use crate::runner::RunnerRef;
use crate::workload::Batch;

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// Reacts to batches of workload events.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Name used in logs and in `DispatchError::Handler`.
    fn name(&self) -> &str;

    /// Processes one batch.
    ///
    /// `batch` may be empty (initial reconciliation with nothing listed).
    async fn handle(
        &self,
        batch: Batch,
        api: ApiClientRef,
        runner: RunnerRef,
    ) -> Result<(), HandlerError>;
}
