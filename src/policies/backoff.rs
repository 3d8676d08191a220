//! # Backoff between worker restarts.
//!
//! The delay before restart `n` (0-indexed count of consecutive failures) is
//! `first × factor^n`, clamped to `max`. With `jitter` enabled the result is
//! spread over `[delay/2, delay]` so workers that failed together do not all
//! come back at the same instant. The base never depends on a previous jittered
//! value.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use workvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: false,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use rand::Rng;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = constant delay).
    pub factor: f64,
    /// Spread delays over `[delay/2, delay]`.
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    /// Constant 3s delay, capped at 30s, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(3),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: false,
        }
    }
}

impl BackoffPolicy {
    /// Fixed delay between restarts.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: false,
        }
    }

    /// Computes the delay before restart number `failures` (0-indexed).
    pub fn next(&self, failures: u32) -> Duration {
        let exp = failures.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        if self.jitter { equal_jitter(base) } else { base }
    }
}

/// `delay/2 + random[0, delay/2]`
fn equal_jitter(delay: Duration) -> Duration {
    let half = (delay.as_millis() / 2) as u64;
    if half == 0 {
        return delay;
    }
    let extra = rand::rng().random_range(0..=half);
    Duration::from_millis(half + extra)
}
