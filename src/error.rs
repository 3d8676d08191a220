//! Error types used by the dispatcher, the runner and workers.
//!
//! - [`DispatchError`]: terminal result of a dispatch loop run.
//! - [`HandlerError`]: returned by handlers while processing a batch.
//! - [`RunnerError`]: conflicting start/stop requests and stop timeouts.
//! - [`WorkerError`]: returned by a single worker attempt.
//! - [`QueueError`]: producer-side queue failures.
//! - [`ManifoldError`]: building the dispatch unit from engine resources.
//! - [`ApiError`]: API client failures.
//! - [`WorkloadError`]: malformed workload identifiers.
//!
//! Every enum provides `as_label` (snake_case, stable) for logs.

use std::time::Duration;
use thiserror::Error;

/// # Errors returned by the API client.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The API could not be reached.
    #[error("api unavailable: {reason}")]
    Unavailable {
        /// Transport-level reason.
        reason: String,
    },

    /// The API answered with an error.
    #[error("api call {call} failed: {error}")]
    Remote {
        /// Name of the remote call.
        call: String,
        /// Error reported by the remote side.
        error: String,
    },
}

impl ApiError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ApiError::Unavailable { .. } => "api_unavailable",
            ApiError::Remote { .. } => "api_remote",
        }
    }
}

/// # Errors returned by event handlers.
///
/// The dispatcher treats both variants the same way (the loop stops); the
/// distinction is there for the engine that classifies the terminal error.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The batch could not be processed; restarting the unit may help.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The batch can never be processed.
    #[error("handler failed (fatal): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Shorthand for [`HandlerError::Fatal`].
    pub fn fatal(error: impl std::fmt::Display) -> Self {
        HandlerError::Fatal {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Fatal { .. } => "handler_fatal",
        }
    }

    /// True for [`HandlerError::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::Fatal { .. })
    }
}

/// # Terminal errors of the dispatch loop.
///
/// This is the value the supervision engine observes when the dispatch unit
/// finishes. `Ok(())` means a clean stop (queue closed or unit killed).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Initial reconciliation could not list workloads.
    #[error("listing workloads failed")]
    List(#[source] ApiError),

    /// A handler returned an error while processing a batch.
    #[error("handler {handler:?} failed")]
    Handler {
        /// Name of the failing handler.
        handler: String,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },

    /// A handler panicked while processing a batch.
    #[error("handler {handler:?} panicked: {info}")]
    HandlerPanicked {
        /// Name of the panicking handler.
        handler: String,
        /// Panic payload, if it was a string.
        info: String,
    },

    /// The dispatcher was started before an API client and a runner were bound.
    #[error("event handlers not initialized: call init() first")]
    NotInitialized,

    /// The dispatch task itself panicked or was aborted.
    #[error("dispatch loop aborted: {info}")]
    Panicked {
        /// Join error description.
        info: String,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::List(_) => "dispatch_list_failed",
            DispatchError::Handler { .. } => "dispatch_handler_failed",
            DispatchError::HandlerPanicked { .. } => "dispatch_handler_panicked",
            DispatchError::NotInitialized => "dispatch_not_initialized",
            DispatchError::Panicked { .. } => "dispatch_panicked",
        }
    }

    /// True when restarting the unit cannot help.
    ///
    /// Only a [`HandlerError::Fatal`] and a missing `init` are fatal; everything
    /// else is left to the engine's retry policy.
    pub fn is_fatal(&self) -> bool {
        match self {
            DispatchError::Handler { source, .. } => source.is_fatal(),
            DispatchError::NotInitialized => true,
            _ => false,
        }
    }
}

/// # Errors produced by the runner.
///
/// Conflicting requests are reported, never silently ignored. Handlers decide
/// whether a conflict matters to them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// A worker for this ID is already running.
    #[error("worker {id:?} already running")]
    DuplicateWorker {
        /// Workload ID.
        id: String,
    },

    /// No worker for this ID is running.
    #[error("worker {id:?} not running")]
    UnknownWorker {
        /// Workload ID.
        id: String,
    },

    /// Workers did not stop within the grace period.
    #[error("stop timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// IDs of the workers that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RunnerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerError::DuplicateWorker { .. } => "runner_duplicate_worker",
            RunnerError::UnknownWorker { .. } => "runner_unknown_worker",
            RunnerError::GraceExceeded { .. } => "runner_grace_exceeded",
        }
    }

    /// True for the two state-conflict variants.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RunnerError::DuplicateWorker { .. } | RunnerError::UnknownWorker { .. }
        )
    }
}

/// # Errors produced by a worker attempt.
///
/// `Timeout` and `Fail` are retryable, `Fatal` ends the worker for good and
/// `Canceled` is a graceful exit.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Attempt exceeded its timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable error (never restarted).
    #[error("fatal error (no restart): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Attempt failed but may succeed if restarted.
    #[error("worker failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed cancellation and exited.
    #[error("worker cancelled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Timeout { .. } => "worker_timeout",
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// True for [`WorkerError::Fail`] and [`WorkerError::Timeout`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Fail { .. } | WorkerError::Timeout { .. })
    }
}

/// # Producer-side queue errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was closed before the batch was accepted.
    #[error("event queue closed")]
    Closed,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Closed => "queue_closed",
        }
    }
}

/// # Errors raised while starting the dispatch unit from engine resources.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifoldError {
    /// A declared input is not available and nothing was bound by `init`.
    #[error("missing input resource {name:?}")]
    MissingInput {
        /// Input name.
        name: String,
    },

    /// An input resource has an unexpected type.
    #[error("input resource {name:?} has unexpected type")]
    ResourceType {
        /// Input name.
        name: String,
    },

    /// A unit started from this manifold is still reconciling or draining.
    #[error("manifold {name:?} already running")]
    AlreadyRunning {
        /// Manifold name.
        name: String,
    },

    /// The dispatcher could not be built.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ManifoldError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ManifoldError::MissingInput { .. } => "manifold_missing_input",
            ManifoldError::ResourceType { .. } => "manifold_resource_type",
            ManifoldError::AlreadyRunning { .. } => "manifold_already_running",
            ManifoldError::Dispatch(_) => "manifold_dispatch",
        }
    }
}

/// # Workload model errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    /// ID is not of the form `<name>/<instance>`.
    #[error("invalid workload id {id:?}: expected <name>/<instance>")]
    InvalidId {
        /// The rejected ID.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_fatality_follows_handler_error() {
        let fatal = DispatchError::Handler {
            handler: "status".into(),
            source: HandlerError::fatal("bad plugin"),
        };
        let retry = DispatchError::Handler {
            handler: "status".into(),
            source: HandlerError::fail("timeout"),
        };
        assert!(fatal.is_fatal());
        assert!(!retry.is_fatal());
        assert!(!DispatchError::List(ApiError::Unavailable { reason: "down".into() }).is_fatal());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(QueueError::Closed.as_label(), "queue_closed");
        assert_eq!(
            RunnerError::UnknownWorker { id: "a/b".into() }.as_label(),
            "runner_unknown_worker"
        );
        assert_eq!(
            WorkerError::Timeout {
                timeout: Duration::from_secs(1)
            }
            .as_label(),
            "worker_timeout"
        );
    }

    #[test]
    fn handler_error_cause_is_reported_once() {
        use std::error::Error as _;

        let err = DispatchError::Handler {
            handler: "h".into(),
            source: HandlerError::fail("boom"),
        };
        assert_eq!(err.to_string(), "handler \"h\" failed");
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("handler failed: boom"));

        let err = DispatchError::List(ApiError::Unavailable { reason: "down".into() });
        assert_eq!(err.to_string(), "listing workloads failed");
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("api unavailable: down"));
    }
}
