//! Moderation item persistence

use crate::item::ModerationItem;
use parking_lot::RwLock;
use policy_log::store::Result;
use std::collections::HashMap;

/// Storage for moderation items, keyed by item id
pub trait ModerationRepository: Send + Sync {
    /// Load one item
    fn get(&self, item_id: &str) -> Result<Option<ModerationItem>>;

    /// Insert or replace an item
    fn put(&self, item: &ModerationItem) -> Result<()>;

    /// Delete an item, returning whether one existed
    fn remove(&self, item_id: &str) -> Result<bool>;

    /// Every stored item
    fn list(&self) -> Result<Vec<ModerationItem>>;
}

/// Moderation repository held in process memory
#[derive(Debug, Default)]
pub struct InMemoryModerationRepository {
    items: RwLock<HashMap<String, ModerationItem>>,
}

impl InMemoryModerationRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModerationRepository for InMemoryModerationRepository {
    fn get(&self, item_id: &str) -> Result<Option<ModerationItem>> {
        Ok(self.items.read().get(item_id).cloned())
    }

    fn put(&self, item: &ModerationItem) -> Result<()> {
        self.items.write().insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn remove(&self, item_id: &str) -> Result<bool> {
        Ok(self.items.write().remove(item_id).is_some())
    }

    fn list(&self) -> Result<Vec<ModerationItem>> {
        Ok(self.items.read().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ContentType, Submission};

    #[test]
    fn test_in_memory_repository() {
        let repo = InMemoryModerationRepository::new();
        let item = ModerationItem::from_submission(
            "item-1".to_string(),
            &Submission::new("child-1", ContentType::Video).with_score(10.0),
        );

        assert!(repo.get("item-1").unwrap().is_none());
        repo.put(&item).unwrap();
        assert_eq!(repo.get("item-1").unwrap(), Some(item));
        assert_eq!(repo.list().unwrap().len(), 1);

        assert!(repo.remove("item-1").unwrap());
        assert!(repo.list().unwrap().is_empty());
    }
}
