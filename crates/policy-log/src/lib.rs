//! Append-only audit log for trust & safety decisions
//!
//! Every consent change, moderation transition and feature assessment is
//! recorded here as a [`PolicyEvent`]. The log is read by export and audit
//! tooling; nothing in it is ever edited or deleted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
pub mod log;
pub mod store;

pub use event::{Actor, PolicyAction, PolicyEvent};
pub use log::{PolicyEventLog, SubjectExport};
pub use store::{EventStore, InMemoryEventStore, StoreError};
