//! Storage layer for the trust & safety engine
//!
//! This crate provides a sled-backed key-value store and durable
//! implementations of the consent, moderation and event repositories.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod repositories;

pub use kv::{KvConfig, KvError, KvStore};
pub use repositories::{KvBackends, KvConsentRepository, KvEventStore, KvModerationRepository};
