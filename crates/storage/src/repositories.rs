//! Durable repositories over [`KvStore`]
//!
//! Key layout:
//!
//! - `consent:{subject}:{capability}` holds a [`ConsentRecord`]
//! - `item:{id}` holds a [`ModerationItem`]
//! - `event:{subject}:{seq}` holds a [`PolicyEvent`], `seq` zero-padded so
//!   key order is append order

use crate::kv::{KvError, KvStore};
use consent::{Capability, ConsentRecord, ConsentRepository};
use moderation::{ModerationItem, ModerationRepository};
use policy_log::store::{EventStore, Result};
use policy_log::{PolicyEvent, StoreError};
use std::sync::Arc;

impl From<KvError> for StoreError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::Serialization(e) => StoreError::Serialization(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Consent records stored in sled
pub struct KvConsentRepository {
    kv: Arc<KvStore>,
}

impl KvConsentRepository {
    /// Create a repository over a shared store
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }
}

impl ConsentRepository for KvConsentRepository {
    fn get(&self, subject_id: &str, capability: Capability) -> Result<Option<ConsentRecord>> {
        Ok(self.kv.get_scoped(&["consent", subject_id, capability.as_str()])?)
    }

    fn put(&self, record: &ConsentRecord) -> Result<()> {
        self.kv.set_scoped(
            &["consent", &record.subject_id, record.capability.as_str()],
            record,
        )?;
        Ok(())
    }

    fn remove(&self, subject_id: &str, capability: Capability) -> Result<bool> {
        Ok(self
            .kv
            .remove_scoped(&["consent", subject_id, capability.as_str()])?)
    }

    fn list(&self, subject_id: &str) -> Result<Vec<ConsentRecord>> {
        let prefix = format!("consent:{}:", subject_id);
        // Subjects containing the separator can share a prefix
        let mut records: Vec<ConsentRecord> = self
            .kv
            .values_with_prefix::<ConsentRecord>(&prefix)?
            .into_iter()
            .filter(|r| r.subject_id == subject_id)
            .collect();
        records.sort_by_key(|r| r.capability);
        Ok(records)
    }
}

/// Moderation items stored in sled
pub struct KvModerationRepository {
    kv: Arc<KvStore>,
}

impl KvModerationRepository {
    /// Create a repository over a shared store
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }
}

impl ModerationRepository for KvModerationRepository {
    fn get(&self, item_id: &str) -> Result<Option<ModerationItem>> {
        Ok(self.kv.get_scoped(&["item", item_id])?)
    }

    fn put(&self, item: &ModerationItem) -> Result<()> {
        self.kv.set_scoped(&["item", &item.id], item)?;
        Ok(())
    }

    fn remove(&self, item_id: &str) -> Result<bool> {
        Ok(self.kv.remove_scoped(&["item", item_id])?)
    }

    fn list(&self) -> Result<Vec<ModerationItem>> {
        Ok(self.kv.values_with_prefix("item:")?)
    }
}

/// Policy events stored in sled
pub struct KvEventStore {
    kv: Arc<KvStore>,
}

impl KvEventStore {
    /// Create an event store over a shared store
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }
}

impl EventStore for KvEventStore {
    fn append(&self, event: &PolicyEvent) -> Result<()> {
        let seq = format!("{:020}", self.kv.generate_id()?);
        self.kv
            .set_scoped(&["event", &event.subject_id, &seq], event)?;
        Ok(())
    }

    fn for_subject(&self, subject_id: &str) -> Result<Vec<PolicyEvent>> {
        let prefix = format!("event:{}:", subject_id);
        Ok(self
            .kv
            .values_with_prefix::<PolicyEvent>(&prefix)?
            .into_iter()
            .filter(|e| e.subject_id == subject_id)
            .collect())
    }

    fn all(&self) -> Result<Vec<PolicyEvent>> {
        Ok(self.kv.values_with_prefix("event:")?)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.kv.count_with_prefix("event:")?)
    }
}

/// The three durable backends sharing one store
pub struct KvBackends {
    /// Consent records
    pub consent: Arc<KvConsentRepository>,
    /// Moderation items
    pub moderation: Arc<KvModerationRepository>,
    /// Policy events
    pub events: Arc<KvEventStore>,
}

impl KvBackends {
    /// Build all backends over one store
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self {
            consent: Arc::new(KvConsentRepository::new(kv.clone())),
            moderation: Arc::new(KvModerationRepository::new(kv.clone())),
            events: Arc::new(KvEventStore::new(kv)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moderation::{ContentType, ModerationState, Submission};
    use policy_log::{Actor, PolicyAction};
    use serde_json::json;

    fn backends() -> KvBackends {
        KvBackends::new(Arc::new(KvStore::in_memory().unwrap()))
    }

    #[test]
    fn test_consent_repository_round_trip() {
        let backends = backends();
        let repo = &backends.consent;

        let mut record = ConsentRecord::default_for("child-1", Capability::LocationTracking);
        record.granted = true;
        repo.put(&record).unwrap();
        repo.put(&ConsentRecord::default_for("child-1", Capability::Essential))
            .unwrap();

        assert_eq!(
            repo.get("child-1", Capability::LocationTracking).unwrap(),
            Some(record)
        );
        let listed = repo.list("child-1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].capability, Capability::Essential);

        assert!(repo.remove("child-1", Capability::LocationTracking).unwrap());
        assert!(repo.get("child-1", Capability::LocationTracking).unwrap().is_none());
    }

    #[test]
    fn test_consent_list_ignores_prefix_collisions() {
        let backends = backends();
        let repo = &backends.consent;
        repo.put(&ConsentRecord::default_for("a", Capability::Essential)).unwrap();
        repo.put(&ConsentRecord::default_for("a:b", Capability::Essential)).unwrap();

        assert_eq!(repo.list("a").unwrap().len(), 1);
        assert_eq!(repo.list("a:b").unwrap().len(), 1);
    }

    #[test]
    fn test_moderation_repository_round_trip() {
        let backends = backends();
        let repo = &backends.moderation;
        let mut item = ModerationItem::from_submission(
            "item-1".to_string(),
            &Submission::new("child-1", ContentType::Video).with_score(12.5),
        );
        repo.put(&item).unwrap();

        item.state = ModerationState::Approved;
        repo.put(&item).unwrap();

        assert_eq!(repo.get("item-1").unwrap(), Some(item));
        assert_eq!(repo.list().unwrap().len(), 1);
        assert!(repo.remove("item-1").unwrap());
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_event_store_keeps_subject_order() {
        let backends = backends();
        let store = &backends.events;

        for n in 0..12 {
            let subject = if n % 2 == 0 { "child-1" } else { "child-2" };
            store
                .append(&PolicyEvent::new(
                    Actor::System,
                    subject,
                    PolicyAction::ConsentGranted,
                    json!({ "n": n }),
                ))
                .unwrap();
        }

        assert_eq!(store.len().unwrap(), 12);
        assert_eq!(store.all().unwrap().len(), 12);

        let order: Vec<u64> = store
            .for_subject("child-1")
            .unwrap()
            .iter()
            .map(|e| e.payload["n"].as_u64().unwrap())
            .collect();
        assert_eq!(order, vec![0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_kv_error_conversion() {
        let err: StoreError = KvError::InvalidKey("item:".to_string()).into();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
