//! Queue statistics for guardian dashboards

use crate::item::{ModerationItem, ModerationState, RejectionReason};
use serde::{Deserialize, Serialize};

/// Item counts by state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStats {
    /// All items
    pub total: usize,
    /// Waiting for a guardian decision
    pub pending: usize,
    /// Waiting for a guardian-child discussion
    pub needs_discussion: usize,
    /// Approved by anyone
    pub approved: usize,
    /// Rejected by anyone
    pub rejected: usize,
    /// Approved by the system without review
    pub auto_approved: usize,
    /// Rejected after repeated discussion
    pub escalated: usize,
}

impl ModerationStats {
    /// Count a set of items
    pub fn from_items(items: &[ModerationItem]) -> Self {
        let mut stats = Self { total: items.len(), ..Self::default() };
        for item in items {
            match item.state {
                ModerationState::Pending => stats.pending += 1,
                ModerationState::NeedsDiscussion => stats.needs_discussion += 1,
                ModerationState::Approved => stats.approved += 1,
                ModerationState::Rejected => stats.rejected += 1,
            }
            if item.is_auto_approved() {
                stats.auto_approved += 1;
            }
            if item.rejection_reason == Some(RejectionReason::EscalatedRepeatedConcern) {
                stats.escalated += 1;
            }
        }
        stats
    }

    /// Items a guardian still has to act on
    pub fn awaiting_guardian(&self) -> usize {
        self.pending + self.needs_discussion
    }
}
