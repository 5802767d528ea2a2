//! Consent ledger
//!
//! The ledger is the only writer of consent records. Every grant and revoke
//! appends one [`PolicyEvent`](policy_log::PolicyEvent); reads fail closed.
//!
//! # Example
//!
//! ```rust
//! use consent::{Capability, ConsentLedger, LawfulBasis};
//! use policy_log::PolicyEventLog;
//!
//! let ledger = ConsentLedger::in_memory(PolicyEventLog::in_memory());
//!
//! assert!(ledger.is_granted("child-1", Capability::Essential));
//! assert!(!ledger.is_granted("child-1", Capability::ActivityAnalysis));
//!
//! ledger.grant("child-1", Capability::ActivityAnalysis, LawfulBasis::Consent).unwrap();
//! assert!(ledger.is_granted("child-1", Capability::ActivityAnalysis));
//! ```

use crate::capability::{Capability, ConsentRecord, LawfulBasis};
use crate::repository::{ConsentRepository, InMemoryConsentRepository};
use crate::{ConsentError, Result};
use chrono::Utc;
use policy_log::{Actor, PolicyAction, PolicyEventLog};
use serde_json::json;
use std::sync::Arc;

/// Read-only consent query used by other components
pub trait ConsentCheck: Send + Sync {
    /// Whether processing for `capability` is permitted for `subject_id`
    fn is_granted(&self, subject_id: &str, capability: Capability) -> bool;
}

/// Per-subject consent state with an audit trail
pub struct ConsentLedger {
    repository: Arc<dyn ConsentRepository>,
    log: PolicyEventLog,
}

impl ConsentLedger {
    /// Create a ledger over a repository and event log
    pub fn new(repository: Arc<dyn ConsentRepository>, log: PolicyEventLog) -> Self {
        Self { repository, log }
    }

    /// Create a ledger backed by an in-memory repository
    pub fn in_memory(log: PolicyEventLog) -> Self {
        Self::new(Arc::new(InMemoryConsentRepository::new()), log)
    }

    /// Create the full set of default records for a new subject
    ///
    /// Subjects that already have records are left untouched and their
    /// current records returned.
    pub fn register_subject(&self, subject_id: &str) -> Result<Vec<ConsentRecord>> {
        if !self.repository.list(subject_id)?.is_empty() {
            return self.records(subject_id);
        }

        let records: Vec<ConsentRecord> = Capability::ALL
            .iter()
            .map(|c| ConsentRecord::default_for(subject_id, *c))
            .collect();
        let mut written = Vec::with_capacity(records.len());
        let mut outcome = Ok(());
        for record in &records {
            if let Err(e) = self.repository.put(record) {
                outcome = Err(e);
                break;
            }
            written.push(record.capability);
        }
        let outcome = outcome.and_then(|_| {
            self.log
                .record(
                    Actor::System,
                    subject_id,
                    PolicyAction::SubjectRegistered,
                    json!({ "capabilities": Capability::ALL.len() }),
                )
                .map(|_| ())
        });

        // Records and the registration event land together or not at all
        if let Err(e) = outcome {
            for capability in written {
                if let Err(rollback_err) = self.repository.remove(subject_id, capability) {
                    tracing::error!("Rollback failed: {}", rollback_err);
                }
            }
            return Err(e.into());
        }
        tracing::info!(subject = %subject_id, "consent profile created");

        Ok(records)
    }

    /// Grant a capability on behalf of the system
    pub fn grant(&self, subject_id: &str, capability: Capability, basis: LawfulBasis) -> Result<()> {
        self.grant_by(Actor::System, subject_id, capability, basis)
    }

    /// Grant a capability, attributing the change to `actor`
    ///
    /// Granting `essential` succeeds without changing state. Repeating a
    /// grant keeps the original grant time.
    pub fn grant_by(
        &self,
        actor: Actor,
        subject_id: &str,
        capability: Capability,
        basis: LawfulBasis,
    ) -> Result<()> {
        if capability.is_essential() {
            self.log.record(
                actor,
                subject_id,
                PolicyAction::ConsentGranted,
                json!({
                    "capability": capability,
                    "lawfulBasis": basis,
                    "changed": false,
                }),
            )?;
            return Ok(());
        }

        let previous = self.repository.get(subject_id, capability)?;
        let mut record = previous
            .clone()
            .unwrap_or_else(|| ConsentRecord::default_for(subject_id, capability));
        let changed = !record.granted || record.lawful_basis != basis;
        if !record.granted {
            record.granted_at = Some(Utc::now());
        }
        record.granted = true;
        record.lawful_basis = basis;

        self.apply(
            previous,
            &record,
            actor,
            PolicyAction::ConsentGranted,
            json!({
                "capability": capability,
                "lawfulBasis": basis,
                "changed": changed,
            }),
        )?;
        tracing::info!(subject = %subject_id, capability = %capability, "consent granted");
        Ok(())
    }

    /// Revoke a capability on behalf of the system
    pub fn revoke(&self, subject_id: &str, capability: Capability) -> Result<()> {
        self.revoke_by(Actor::System, subject_id, capability)
    }

    /// Revoke a capability, attributing the change to `actor`
    pub fn revoke_by(&self, actor: Actor, subject_id: &str, capability: Capability) -> Result<()> {
        if capability.is_essential() {
            tracing::warn!(subject = %subject_id, "attempt to revoke essential capability");
            return Err(ConsentError::EssentialCapabilityImmutable);
        }

        let previous = self.repository.get(subject_id, capability)?;
        let mut record = previous
            .clone()
            .unwrap_or_else(|| ConsentRecord::default_for(subject_id, capability));
        let changed = record.granted;
        record.granted = false;
        record.granted_at = None;

        self.apply(
            previous,
            &record,
            actor,
            PolicyAction::ConsentRevoked,
            json!({
                "capability": capability,
                "changed": changed,
            }),
        )?;
        tracing::info!(subject = %subject_id, capability = %capability, "consent revoked");
        Ok(())
    }

    /// Whether a capability is granted; never fails
    ///
    /// Unknown subjects and unreadable records read as not granted, except
    /// `essential`, which is always granted.
    pub fn is_granted(&self, subject_id: &str, capability: Capability) -> bool {
        if capability.is_essential() {
            return true;
        }
        match self.repository.get(subject_id, capability) {
            Ok(Some(record)) => record.granted,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    subject = %subject_id,
                    capability = %capability,
                    "consent lookup failed, treating as not granted: {}",
                    e
                );
                false
            }
        }
    }

    /// Current record for one capability, falling back to the default
    pub fn record(&self, subject_id: &str, capability: Capability) -> Result<ConsentRecord> {
        if capability.is_essential() {
            return Ok(ConsentRecord::default_for(subject_id, capability));
        }
        Ok(self
            .repository
            .get(subject_id, capability)?
            .unwrap_or_else(|| ConsentRecord::default_for(subject_id, capability)))
    }

    /// Current records for every capability, in [`Capability::ALL`] order
    pub fn records(&self, subject_id: &str) -> Result<Vec<ConsentRecord>> {
        Capability::ALL
            .iter()
            .map(|c| self.record(subject_id, *c))
            .collect()
    }

    /// Capabilities currently granted for a subject
    pub fn granted_capabilities(&self, subject_id: &str) -> Vec<Capability> {
        Capability::ALL
            .iter()
            .copied()
            .filter(|c| self.is_granted(subject_id, *c))
            .collect()
    }

    /// Underlying event log
    pub fn log(&self) -> &PolicyEventLog {
        &self.log
    }

    /// Write a record and its event, restoring the previous record if the
    /// event cannot be appended
    fn apply(
        &self,
        previous: Option<ConsentRecord>,
        record: &ConsentRecord,
        actor: Actor,
        action: PolicyAction,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.repository.put(record)?;

        if let Err(e) = self.log.record(actor, &record.subject_id, action, payload) {
            let rollback = match previous {
                Some(prev) => self.repository.put(&prev),
                None => self
                    .repository
                    .remove(&record.subject_id, record.capability)
                    .map(|_| ()),
            };
            if let Err(rollback_err) = rollback {
                tracing::error!("Rollback failed: {}", rollback_err);
            }
            return Err(e.into());
        }

        Ok(())
    }
}

impl ConsentCheck for ConsentLedger {
    fn is_granted(&self, subject_id: &str, capability: Capability) -> bool {
        ConsentLedger::is_granted(self, subject_id, capability)
    }
}
