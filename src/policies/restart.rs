//! # Restart policies for workload workers.
//!
//! - [`RestartPolicy::Never`] the worker runs once.
//! - [`RestartPolicy::OnFailure`] the worker is restarted after a retryable
//!   error (default). A clean exit ends supervision.
//! - [`RestartPolicy::Always`] the worker is restarted after any exit except a
//!   fatal error or cancellation. Status pollers and similar loops use this.

use crate::error::WorkerError;

/// Policy controlling whether a worker is started again after an attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Run once.
    Never,
    /// Restart after retryable failures only.
    #[default]
    OnFailure,
    /// Restart after every non-fatal exit.
    Always,
}

impl RestartPolicy {
    /// Decides whether another attempt follows the given outcome.
    ///
    /// Cancellation and fatal errors always end supervision.
    pub fn should_restart(&self, outcome: &Result<(), WorkerError>) -> bool {
        match (self, outcome) {
            (RestartPolicy::Never, _) => false,
            (_, Err(WorkerError::Canceled)) | (_, Err(WorkerError::Fatal { .. })) => false,
            (RestartPolicy::OnFailure, Ok(())) => false,
            (RestartPolicy::OnFailure, Err(e)) => e.is_retryable(),
            (RestartPolicy::Always, _) => true,
        }
    }
}
