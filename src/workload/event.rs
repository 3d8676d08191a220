//! # Workload events.
//!
//! An [`Event`] says that something happened to one workload. Events are plain
//! immutable values; a [`Batch`] groups the events of one `add_events` call (or
//! of one listing reconciliation) and is shared between handlers without
//! copying.
//!
//! ## Example
//! ```rust
//! use workvisor::{Event, EventKind};
//!
//! let ev = Event::tracked("spam/eggs");
//! assert_eq!(ev.kind, EventKind::Tracked);
//! assert_eq!(ev.id, "spam/eggs");
//! ```

use std::fmt;
use std::sync::Arc;

/// Ordered group of events delivered together to every handler.
pub type Batch = Arc<[Event]>;

/// Classification of workload events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Workload is now tracked (started or discovered by listing).
    Tracked,
    /// Workload is no longer tracked.
    Untracked,
    /// Workload failed and should no longer be supervised.
    Failed,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::Tracked => "tracked",
            EventKind::Untracked => "untracked",
            EventKind::Failed => "failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A single workload event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Workload ID (`<name>/<instance>`).
    pub id: String,
}

impl Event {
    /// Creates an event of the given kind.
    pub fn new(kind: EventKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for an [`EventKind::Tracked`] event.
    pub fn tracked(id: impl Into<String>) -> Self {
        Self::new(EventKind::Tracked, id)
    }

    /// Shorthand for an [`EventKind::Untracked`] event.
    pub fn untracked(id: impl Into<String>) -> Self {
        Self::new(EventKind::Untracked, id)
    }

    /// Shorthand for an [`EventKind::Failed`] event.
    pub fn failed(id: impl Into<String>) -> Self {
        Self::new(EventKind::Failed, id)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
