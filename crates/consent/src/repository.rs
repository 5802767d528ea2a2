//! Consent record persistence
//!
//! The ledger never owns storage directly; it works through
//! [`ConsentRepository`]. Absent records mean "never changed" and are read
//! as the capability default.

use crate::capability::{Capability, ConsentRecord};
use parking_lot::RwLock;
use policy_log::store::Result;
use std::collections::HashMap;

/// Storage for consent records, keyed by subject and capability
pub trait ConsentRepository: Send + Sync {
    /// Load one record
    fn get(&self, subject_id: &str, capability: Capability) -> Result<Option<ConsentRecord>>;

    /// Insert or replace a record
    fn put(&self, record: &ConsentRecord) -> Result<()>;

    /// Delete a record, returning whether one existed
    fn remove(&self, subject_id: &str, capability: Capability) -> Result<bool>;

    /// All stored records for a subject
    fn list(&self, subject_id: &str) -> Result<Vec<ConsentRecord>>;
}

/// Consent repository held in process memory
#[derive(Debug, Default)]
pub struct InMemoryConsentRepository {
    records: RwLock<HashMap<(String, Capability), ConsentRecord>>,
}

impl InMemoryConsentRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsentRepository for InMemoryConsentRepository {
    fn get(&self, subject_id: &str, capability: Capability) -> Result<Option<ConsentRecord>> {
        Ok(self
            .records
            .read()
            .get(&(subject_id.to_string(), capability))
            .cloned())
    }

    fn put(&self, record: &ConsentRecord) -> Result<()> {
        self.records
            .write()
            .insert((record.subject_id.clone(), record.capability), record.clone());
        Ok(())
    }

    fn remove(&self, subject_id: &str, capability: Capability) -> Result<bool> {
        Ok(self
            .records
            .write()
            .remove(&(subject_id.to_string(), capability))
            .is_some())
    }

    fn list(&self, subject_id: &str) -> Result<Vec<ConsentRecord>> {
        let mut records: Vec<ConsentRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.capability);
        Ok(records)
    }
}
