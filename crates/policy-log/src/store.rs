//! Event storage backends
//!
//! [`EventStore`] is the persistence seam for the audit log. The in-memory
//! store here backs tests and ephemeral deployments; the `storage` crate
//! provides a durable one.

use crate::event::PolicyEvent;
use parking_lot::RwLock;
use thiserror::Error;

/// Errors raised by repository and event store backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (I/O, database)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Append-only event persistence
///
/// Implementations must accept concurrent appends. Per-subject ordering must
/// match append order; ordering across subjects is not significant.
pub trait EventStore: Send + Sync {
    /// Append one event
    fn append(&self, event: &PolicyEvent) -> Result<()>;

    /// All events for a subject, in append order
    fn for_subject(&self, subject_id: &str) -> Result<Vec<PolicyEvent>>;

    /// Every stored event
    fn all(&self) -> Result<Vec<PolicyEvent>>;

    /// Number of stored events
    fn len(&self) -> Result<usize>;
}

/// Event store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<PolicyEvent>>,
}

impl InMemoryEventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: &PolicyEvent) -> Result<()> {
        self.events.write().push(event.clone());
        Ok(())
    }

    fn for_subject(&self, subject_id: &str) -> Result<Vec<PolicyEvent>> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<PolicyEvent>> {
        Ok(self.events.read().clone())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.events.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Actor, PolicyAction};
    use serde_json::json;

    fn event(subject: &str, n: u32) -> PolicyEvent {
        PolicyEvent::new(Actor::System, subject, PolicyAction::ConsentGranted, json!({ "n": n }))
    }

    #[test]
    fn test_in_memory_append_and_filter() {
        let store = InMemoryEventStore::new();
        store.append(&event("alice", 1)).unwrap();
        store.append(&event("bob", 2)).unwrap();
        store.append(&event("alice", 3)).unwrap();

        assert_eq!(store.len().unwrap(), 3);

        let alice = store.for_subject("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].payload["n"], 1);
        assert_eq!(alice[1].payload["n"], 3);

        assert!(store.for_subject("carol").unwrap().is_empty());
    }

    #[test]
    fn test_in_memory_concurrent_appends() {
        let store = std::sync::Arc::new(InMemoryEventStore::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let subject = format!("subject-{}", t);
                    for n in 0..50 {
                        store.append(&event(&subject, n)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len().unwrap(), 200);
        let events = store.for_subject("subject-2").unwrap();
        let order: Vec<u64> = events.iter().map(|e| e.payload["n"].as_u64().unwrap()).collect();
        assert_eq!(order, (0..50).collect::<Vec<u64>>());
    }

    #[test]
    fn test_store_error_display() {
        let error = StoreError::Backend("disk full".to_string());
        assert!(format!("{}", error).contains("disk full"));
    }
}
