//! Moderation decision engine
//!
//! # State machine
//!
//! ```text
//!                  +------------> Approved
//!                  |
//! intake ----> Pending ---------> Rejected
//!               ^   |
//!               |   v
//!          NeedsDiscussion
//! ```
//!
//! - Without `activityAnalysis` consent an item goes straight to
//!   `NeedsDiscussion` and its score is never acted on.
//! - Otherwise: score below `auto_approve_below` is approved by the system,
//!   score at or above `discussion_at_or_above` goes to `NeedsDiscussion`,
//!   everything in between waits in `Pending` for a guardian.
//! - Guardians approve or reject only from `Pending`.
//! - Leaving `NeedsDiscussion` always goes back to `Pending` and increments
//!   `review_count`. Entering `NeedsDiscussion` once `review_count` has
//!   reached `max_discussion_returns` rejects the item instead.
//!
//! The engine does no locking of its own. Callers serialize operations on
//! the same item id.
//!
//! # Example
//!
//! ```rust
//! use consent::{Capability, ConsentLedger, LawfulBasis};
//! use moderation::{ContentType, ModerationDecisionEngine, ModerationState, Submission};
//! use policy_log::PolicyEventLog;
//! use std::sync::Arc;
//!
//! let log = PolicyEventLog::in_memory();
//! let ledger = Arc::new(ConsentLedger::in_memory(log.clone()));
//! ledger.grant("child-1", Capability::ActivityAnalysis, LawfulBasis::Consent).unwrap();
//!
//! let engine = ModerationDecisionEngine::in_memory(ledger, log);
//! let item = engine
//!     .submit(Submission::new("child-1", ContentType::Image).with_score(45.0))
//!     .unwrap();
//! assert_eq!(item.state, ModerationState::Pending);
//!
//! let item = engine.approve(&item.id, "parent-1").unwrap();
//! assert_eq!(item.state, ModerationState::Approved);
//! ```

use crate::config::ModerationConfig;
use crate::item::{
    DiscussionReason, ModerationItem, ModerationState, RejectionReason, Submission,
};
use crate::repository::{InMemoryModerationRepository, ModerationRepository};
use crate::stats::ModerationStats;
use crate::{ModerationError, Result};
use chrono::Utc;
use consent::{Capability, ConsentCheck};
use policy_log::{Actor, PolicyAction, PolicyEventLog, StoreError};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Owns moderation items and applies every state change
pub struct ModerationDecisionEngine {
    config: ModerationConfig,
    repository: Arc<dyn ModerationRepository>,
    consent: Arc<dyn ConsentCheck>,
    log: PolicyEventLog,
}

impl ModerationDecisionEngine {
    /// Create an engine, validating the configuration
    pub fn new(
        config: ModerationConfig,
        repository: Arc<dyn ModerationRepository>,
        consent: Arc<dyn ConsentCheck>,
        log: PolicyEventLog,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, repository, consent, log })
    }

    /// Create an engine with default thresholds and in-memory storage
    pub fn in_memory(consent: Arc<dyn ConsentCheck>, log: PolicyEventLog) -> Self {
        Self {
            config: ModerationConfig::default(),
            repository: Arc::new(InMemoryModerationRepository::new()),
            consent,
            log,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Take in a scored submission and route it
    ///
    /// Returns the item as it stands after routing.
    pub fn submit(&self, submission: Submission) -> Result<ModerationItem> {
        let id = submission
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.repository.get(&id)?.is_some() {
            return Err(ModerationError::DuplicateItem(id));
        }

        let item = ModerationItem::from_submission(id, &submission);
        if submission.ai_risk_score != Some(item.ai_risk_score) {
            tracing::warn!(
                item = %item.id,
                score = ?submission.ai_risk_score,
                "unusable risk score, treating as maximal risk"
            );
        }

        self.repository.put(&item)?;
        let item_id = item.id.clone();
        let routed = self
            .log
            .record(
                Actor::Subject(item.submitter_id.clone()),
                &item.submitter_id,
                PolicyAction::ItemSubmitted,
                json!({
                    "itemId": item.id,
                    "state": item.state,
                    "contentType": item.content_type,
                    "aiRiskScore": item.ai_risk_score,
                    "aiFlags": item.ai_flags,
                }),
            )
            .map_err(ModerationError::from)
            .and_then(|_| self.route(item));

        // An unrouted item must never reach a guardian queue
        if routed.is_err() {
            if let Err(rollback_err) = self.repository.remove(&item_id) {
                tracing::error!("Rollback failed: {}", rollback_err);
            }
        }
        routed
    }

    fn route(&self, item: ModerationItem) -> Result<ModerationItem> {
        if !self
            .consent
            .is_granted(&item.submitter_id, Capability::ActivityAnalysis)
        {
            tracing::info!(item = %item.id, "activity analysis not consented, sending to discussion");
            return self.enter_discussion(item, DiscussionReason::ConsentRequired, Actor::System);
        }

        let score = item.ai_risk_score;
        if score < self.config.auto_approve_below {
            let next = ModerationItem {
                state: ModerationState::Approved,
                decided_at: Some(Utc::now()),
                decided_by: Some(Actor::System),
                ..item.clone()
            };
            self.commit(&item, next, Actor::System, json!({ "reason": "lowRisk" }))
        } else if score >= self.config.discussion_at_or_above {
            self.enter_discussion(item, DiscussionReason::HighRisk, Actor::System)
        } else {
            tracing::debug!(item = %item.id, score, "queued for guardian review");
            Ok(item)
        }
    }

    // =========================================================================
    // Guardian actions
    // =========================================================================

    /// Approve a pending item
    pub fn approve(&self, item_id: &str, guardian_id: &str) -> Result<ModerationItem> {
        let item = self.load(item_id)?;
        Self::require_state(&item, ModerationState::Pending, "approve")?;

        let actor = Actor::guardian(guardian_id);
        let next = ModerationItem {
            state: ModerationState::Approved,
            decided_at: Some(Utc::now()),
            decided_by: Some(actor.clone()),
            ..item.clone()
        };
        self.commit(&item, next, actor, json!({}))
    }

    /// Reject a pending item
    pub fn reject(
        &self,
        item_id: &str,
        guardian_id: &str,
        reason: impl Into<String>,
    ) -> Result<ModerationItem> {
        let item = self.load(item_id)?;
        Self::require_state(&item, ModerationState::Pending, "reject")?;

        let actor = Actor::guardian(guardian_id);
        let reason = RejectionReason::Guardian(reason.into());
        let next = ModerationItem {
            state: ModerationState::Rejected,
            decided_at: Some(Utc::now()),
            decided_by: Some(actor.clone()),
            rejection_reason: Some(reason.clone()),
            ..item.clone()
        };
        self.commit(&item, next, actor, json!({ "rejectionReason": reason }))
    }

    /// Send a pending item to discussion
    pub fn request_discussion(&self, item_id: &str, guardian_id: &str) -> Result<ModerationItem> {
        let item = self.load(item_id)?;
        Self::require_state(&item, ModerationState::Pending, "request discussion for")?;
        self.enter_discussion(item, DiscussionReason::GuardianRequested, Actor::guardian(guardian_id))
    }

    /// Record that the discussion happened and return the item to pending
    pub fn resolve_discussion(
        &self,
        item_id: &str,
        guardian_id: &str,
        note: impl Into<String>,
    ) -> Result<ModerationItem> {
        let item = self.load(item_id)?;
        Self::require_state(&item, ModerationState::NeedsDiscussion, "resolve discussion for")?;

        let next = ModerationItem {
            state: ModerationState::Pending,
            review_count: item.review_count + 1,
            ..item.clone()
        };
        self.commit(&item, next, Actor::guardian(guardian_id), json!({ "note": note.into() }))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of one item
    pub fn get(&self, item_id: &str) -> Result<ModerationItem> {
        self.load(item_id)
    }

    /// Items waiting for a guardian decision, oldest first
    pub fn pending_queue(&self) -> Result<Vec<ModerationItem>> {
        self.items_in(ModerationState::Pending)
    }

    /// Items waiting for a discussion, oldest first
    pub fn discussion_queue(&self) -> Result<Vec<ModerationItem>> {
        self.items_in(ModerationState::NeedsDiscussion)
    }

    /// Every item submitted by one child, oldest first
    pub fn items_for_submitter(&self, submitter_id: &str) -> Result<Vec<ModerationItem>> {
        let mut items: Vec<ModerationItem> = self
            .repository
            .list()?
            .into_iter()
            .filter(|i| i.submitter_id == submitter_id)
            .collect();
        sort_oldest_first(&mut items);
        Ok(items)
    }

    /// Counts by state
    pub fn stats(&self) -> Result<ModerationStats> {
        Ok(ModerationStats::from_items(&self.repository.list()?))
    }

    /// States an item has visited, rebuilt from the event log
    pub fn state_path(&self, item_id: &str) -> Result<Vec<ModerationState>> {
        let item = self.load(item_id)?;
        let mut path = Vec::new();
        for event in self.log.for_subject(&item.submitter_id)? {
            if event.payload_str("itemId") != Some(item_id) {
                continue;
            }
            let field = match event.action {
                PolicyAction::ItemSubmitted => "state",
                PolicyAction::ItemStateChanged => "to",
                _ => continue,
            };
            let state: ModerationState = serde_json::from_value(event.payload[field].clone())
                .map_err(StoreError::from)?;
            path.push(state);
        }
        Ok(path)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn load(&self, item_id: &str) -> Result<ModerationItem> {
        self.repository
            .get(item_id)?
            .ok_or_else(|| ModerationError::ItemNotFound(item_id.to_string()))
    }

    fn items_in(&self, state: ModerationState) -> Result<Vec<ModerationItem>> {
        let mut items: Vec<ModerationItem> = self
            .repository
            .list()?
            .into_iter()
            .filter(|i| i.state == state)
            .collect();
        sort_oldest_first(&mut items);
        Ok(items)
    }

    fn require_state(
        item: &ModerationItem,
        expected: ModerationState,
        action: &'static str,
    ) -> Result<()> {
        if item.state != expected {
            return Err(ModerationError::InvalidTransition {
                item_id: item.id.clone(),
                state: item.state,
                action,
            });
        }
        Ok(())
    }

    fn enter_discussion(
        &self,
        item: ModerationItem,
        reason: DiscussionReason,
        actor: Actor,
    ) -> Result<ModerationItem> {
        if item.review_count >= self.config.max_discussion_returns {
            tracing::warn!(
                item = %item.id,
                review_count = item.review_count,
                "repeated discussion, rejecting item"
            );
            let rejection = RejectionReason::EscalatedRepeatedConcern;
            let next = ModerationItem {
                state: ModerationState::Rejected,
                decided_at: Some(Utc::now()),
                decided_by: Some(Actor::System),
                rejection_reason: Some(rejection.clone()),
                ..item.clone()
            };
            return self.commit(
                &item,
                next,
                actor,
                json!({ "rejectionReason": rejection, "discussionReason": reason }),
            );
        }

        let next = ModerationItem {
            state: ModerationState::NeedsDiscussion,
            discussion_reason: Some(reason),
            ..item.clone()
        };
        self.commit(&item, next, actor, json!({ "discussionReason": reason }))
    }

    /// Persist `next` and append its event, restoring `previous` if the
    /// append fails
    fn commit(
        &self,
        previous: &ModerationItem,
        next: ModerationItem,
        actor: Actor,
        details: serde_json::Value,
    ) -> Result<ModerationItem> {
        debug_assert!(previous.state.can_transition_to(next.state));

        let mut payload = json!({
            "itemId": next.id,
            "from": previous.state,
            "to": next.state,
            "reviewCount": next.review_count,
        });
        if let (Some(payload), Some(details)) = (payload.as_object_mut(), details.as_object()) {
            for (key, value) in details {
                payload.insert(key.clone(), value.clone());
            }
        }

        self.repository.put(&next)?;
        if let Err(e) =
            self.log
                .record(actor, &next.submitter_id, PolicyAction::ItemStateChanged, payload)
        {
            if let Err(rollback_err) = self.repository.put(previous) {
                tracing::error!("Rollback failed: {}", rollback_err);
            }
            return Err(e.into());
        }

        tracing::info!(
            item = %next.id,
            from = %previous.state,
            to = %next.state,
            "moderation state changed"
        );
        Ok(next)
    }
}

fn sort_oldest_first(items: &mut [ModerationItem]) {
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
