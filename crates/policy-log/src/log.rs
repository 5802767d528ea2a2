//! The policy event log
//!
//! [`PolicyEventLog`] is a cheap-to-clone handle over an [`EventStore`]. The
//! consent ledger, the moderation engine and the assessment registry all
//! append through the same handle.
//!
//! # Example
//!
//! ```rust
//! use policy_log::{Actor, PolicyAction, PolicyEventLog};
//! use serde_json::json;
//!
//! let log = PolicyEventLog::in_memory();
//! log.record(Actor::System, "child-1", PolicyAction::ConsentGranted, json!({})).unwrap();
//!
//! let export = log.export_subject("child-1").unwrap();
//! assert_eq!(export.event_count, 1);
//! ```

use crate::event::{Actor, PolicyAction, PolicyEvent};
use crate::store::{EventStore, InMemoryEventStore, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything recorded about one subject, for access and portability requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectExport {
    /// Subject the export covers
    pub subject_id: String,
    /// When the export was produced
    pub exported_at: DateTime<Utc>,
    /// Number of events
    pub event_count: usize,
    /// Events in append order
    pub events: Vec<PolicyEvent>,
}

impl SubjectExport {
    /// Serialize the export as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Shared handle to the append-only policy log
#[derive(Clone)]
pub struct PolicyEventLog {
    store: Arc<dyn EventStore>,
}

impl PolicyEventLog {
    /// Create a log over the given store
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Create a log backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEventStore::new()))
    }

    /// Append a prepared event
    pub fn append(&self, event: PolicyEvent) -> Result<PolicyEvent> {
        self.store.append(&event)?;
        tracing::debug!(
            subject = %event.subject_id,
            action = event.action.as_str(),
            actor = %event.actor,
            "policy event appended"
        );
        Ok(event)
    }

    /// Build and append an event stamped with the current time
    pub fn record(
        &self,
        actor: Actor,
        subject_id: &str,
        action: PolicyAction,
        payload: serde_json::Value,
    ) -> Result<PolicyEvent> {
        self.append(PolicyEvent::new(actor, subject_id, action, payload))
    }

    /// Events for one subject, in append order
    pub fn for_subject(&self, subject_id: &str) -> Result<Vec<PolicyEvent>> {
        self.store.for_subject(subject_id)
    }

    /// Events for one subject with the given action
    pub fn for_subject_action(
        &self,
        subject_id: &str,
        action: PolicyAction,
    ) -> Result<Vec<PolicyEvent>> {
        Ok(self
            .store
            .for_subject(subject_id)?
            .into_iter()
            .filter(|e| e.action == action)
            .collect())
    }

    /// Every event in the log
    pub fn all(&self) -> Result<Vec<PolicyEvent>> {
        self.store.all()
    }

    /// Number of events in the log
    pub fn len(&self) -> Result<usize> {
        self.store.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.len()? == 0)
    }

    /// Export the complete record for a subject
    pub fn export_subject(&self, subject_id: &str) -> Result<SubjectExport> {
        let events = self.store.for_subject(subject_id)?;
        tracing::info!(subject = %subject_id, events = events.len(), "subject export produced");
        Ok(SubjectExport {
            subject_id: subject_id.to_string(),
            exported_at: Utc::now(),
            event_count: events.len(),
            events,
        })
    }
}

impl std::fmt::Debug for PolicyEventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEventLog").finish_non_exhaustive()
    }
}
