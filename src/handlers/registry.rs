//! # HandlerRegistry: ordered, append-only list of handlers.
//!
//! Registration may happen from any thread at any time. A dispatcher works on
//! a [`snapshot`](HandlerRegistry::snapshot) taken when it is built, so a
//! handler registered later only reaches the next dispatcher.

use std::sync::{Arc, Mutex, PoisonError};

use crate::handlers::handler::HandlerRef;

/// Ordered handler list.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Mutex<Vec<HandlerRef>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. No de-duplication.
    pub fn register(&self, handler: HandlerRef) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Handlers in registration order, as of now.
    pub fn snapshot(&self) -> Arc<[HandlerRef]> {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .snapshot()
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        f.debug_struct("HandlerRegistry").field("handlers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::api::ApiClientRef;
    use crate::error::HandlerError;
    use crate::handlers::HandlerFn;
    use crate::runner::RunnerRef;
    use crate::workload::Batch;

    fn noop(name: &'static str) -> HandlerRef {
        HandlerFn::arc(name, |_b: Batch, _a: ApiClientRef, _r: RunnerRef| async {
            Ok::<(), HandlerError>(())
        })
    }

    #[test]
    fn snapshot_keeps_registration_order_and_duplicates() {
        let reg = HandlerRegistry::new();
        assert!(reg.is_empty());

        let a = noop("a");
        reg.register(a.clone());
        reg.register(noop("b"));
        reg.register(a);

        let snap = reg.snapshot();
        let names: Vec<&str> = snap.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn later_registration_does_not_change_an_earlier_snapshot() {
        let reg = HandlerRegistry::new();
        reg.register(noop("a"));
        let snap = reg.snapshot();
        reg.register(noop("b"));

        assert_eq!(snap.len(), 1);
        assert_eq!(reg.snapshot().len(), 2);
    }
}
