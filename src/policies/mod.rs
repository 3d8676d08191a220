//! Worker restart policies.
//!
//! - [`RestartPolicy`] whether a finished worker is started again
//! - [`BackoffPolicy`] how long the runner waits before restarting it
//!
//! ```text
//! WorkerSpec { restart, backoff, timeout }
//!      └─► runner::actor::WorkerActor
//!           - restart decides continue/exit after each attempt
//!           - backoff.next(failures) spaces out failing attempts
//! ```

mod backoff;
mod restart;

pub use backoff::BackoffPolicy;
pub use restart::RestartPolicy;
