//! Workload data model.
//!
//! - [`Event`], [`EventKind`] notifications that a workload changed
//! - [`Batch`] ordered, shared group of events delivered together
//! - [`Info`] workload descriptor returned by the API listing
//! - [`build_id`], [`parse_id`] helpers for `<name>/<instance>` IDs

mod event;
mod id;
mod info;

pub use event::{Batch, Event, EventKind};
pub use id::{build_id, parse_id};
pub use info::Info;
