//! Moderation items and their states
//!
//! A [`ModerationItem`] is owned by the decision engine. Callers only ever
//! see cloned snapshots.

use chrono::{DateTime, Utc};
use policy_log::Actor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Risk score used when the scanner gives none or an unusable one
pub const FAIL_SAFE_RISK_SCORE: f64 = 100.0;

/// Kind of content submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Video upload
    Video,
    /// Photo upload
    Image,
    /// Text comment
    Comment,
    /// Change to the child's profile
    ProfileUpdate,
}

/// Position of an item in the moderation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    /// Waiting for a guardian decision
    Pending,
    /// Published (terminal)
    Approved,
    /// Refused (terminal)
    Rejected,
    /// Guardian and child must talk before any decision
    NeedsDiscussion,
}

impl ModerationState {
    /// Check if no further transition is defined
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModerationState::Approved | ModerationState::Rejected)
    }

    /// Check if the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: ModerationState) -> bool {
        use ModerationState::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, NeedsDiscussion) | (NeedsDiscussion, Pending)
        )
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NeedsDiscussion => "needs_discussion",
        }
    }
}

impl std::fmt::Display for ModerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an item was sent to discussion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscussionReason {
    /// Activity analysis is not consented, so the item was never scored
    ConsentRequired,
    /// The risk score reached the discussion threshold
    HighRisk,
    /// A guardian asked to talk about it
    GuardianRequested,
}

/// Why an item was rejected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum RejectionReason {
    /// A guardian rejected it
    Guardian(String),
    /// The item kept returning to discussion
    EscalatedRepeatedConcern,
}

impl RejectionReason {
    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            RejectionReason::Guardian(reason) => reason.clone(),
            RejectionReason::EscalatedRepeatedConcern => {
                "Rejected after repeated discussion".to_string()
            }
        }
    }
}

/// A content item as handed over by the upstream scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Item id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Child who submitted the content
    pub submitter_id: String,
    /// Kind of content
    pub content_type: ContentType,
    /// Scanner risk score, 0 to 100
    #[serde(default)]
    pub ai_risk_score: Option<f64>,
    /// Scanner flags
    #[serde(default)]
    pub ai_flags: BTreeSet<String>,
}

impl Submission {
    /// Create a submission without a score or flags
    pub fn new(submitter_id: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            id: None,
            submitter_id: submitter_id.into(),
            content_type,
            ai_risk_score: None,
            ai_flags: BTreeSet::new(),
        }
    }

    /// Use a caller-chosen id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the scanner risk score
    pub fn with_score(mut self, score: f64) -> Self {
        self.ai_risk_score = Some(score);
        self
    }

    /// Add a scanner flag
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.ai_flags.insert(flag.into());
        self
    }

    /// Score the engine will act on
    ///
    /// Missing, NaN and out-of-range scores become
    /// [`FAIL_SAFE_RISK_SCORE`].
    pub fn effective_score(&self) -> f64 {
        match self.ai_risk_score {
            Some(score) if (0.0..=100.0).contains(&score) => score,
            _ => FAIL_SAFE_RISK_SCORE,
        }
    }
}

/// Engine-owned record of a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationItem {
    /// Item id
    pub id: String,
    /// Child who submitted the content
    pub submitter_id: String,
    /// Kind of content
    pub content_type: ContentType,
    /// Risk score the engine acted on
    pub ai_risk_score: f64,
    /// Scanner flags
    pub ai_flags: BTreeSet<String>,
    /// Current state
    pub state: ModerationState,
    /// When the item entered moderation
    pub created_at: DateTime<Utc>,
    /// When a terminal decision was made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    /// Who made the terminal decision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<Actor>,
    /// Set when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<RejectionReason>,
    /// Set while (or after) the item is in discussion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_reason: Option<DiscussionReason>,
    /// Number of returns from discussion to pending
    pub review_count: u32,
}

impl ModerationItem {
    /// Create a pending item from a submission
    pub fn from_submission(id: String, submission: &Submission) -> Self {
        Self {
            id,
            submitter_id: submission.submitter_id.clone(),
            content_type: submission.content_type,
            ai_risk_score: submission.effective_score(),
            ai_flags: submission.ai_flags.clone(),
            state: ModerationState::Pending,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
            rejection_reason: None,
            discussion_reason: None,
            review_count: 0,
        }
    }

    /// Check if the item has reached a terminal state
    pub fn is_decided(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if the system approved the item without guardian input
    pub fn is_auto_approved(&self) -> bool {
        self.state == ModerationState::Approved
            && self.decided_by.as_ref().is_some_and(Actor::is_system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ModerationState::Approved.is_terminal());
        assert!(ModerationState::Rejected.is_terminal());
        assert!(!ModerationState::Pending.is_terminal());
        assert!(!ModerationState::NeedsDiscussion.is_terminal());
    }

    #[test]
    fn test_allowed_transitions() {
        use ModerationState::*;
        let all = [Pending, Approved, Rejected, NeedsDiscussion];

        let allowed: Vec<(ModerationState, ModerationState)> = all
            .iter()
            .flat_map(|from| all.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (Pending, Approved),
                (Pending, Rejected),
                (Pending, NeedsDiscussion),
                (NeedsDiscussion, Pending),
            ]
        );
    }

    #[test]
    fn test_effective_score() {
        let base = Submission::new("child-1", ContentType::Image);
        assert_eq!(base.effective_score(), FAIL_SAFE_RISK_SCORE);
        assert_eq!(base.clone().with_score(f64::NAN).effective_score(), FAIL_SAFE_RISK_SCORE);
        assert_eq!(base.clone().with_score(-5.0).effective_score(), FAIL_SAFE_RISK_SCORE);
        assert_eq!(base.clone().with_score(100.5).effective_score(), FAIL_SAFE_RISK_SCORE);
        assert_eq!(base.clone().with_score(0.0).effective_score(), 0.0);
        assert_eq!(base.with_score(29.999).effective_score(), 29.999);
    }

    #[test]
    fn test_item_from_submission() {
        let submission = Submission::new("child-1", ContentType::Comment)
            .with_score(42.0)
            .with_flag("profanity");
        let item = ModerationItem::from_submission("item-1".to_string(), &submission);

        assert_eq!(item.state, ModerationState::Pending);
        assert_eq!(item.ai_risk_score, 42.0);
        assert!(item.ai_flags.contains("profanity"));
        assert_eq!(item.review_count, 0);
        assert!(!item.is_decided());
        assert!(!item.is_auto_approved());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ModerationState::NeedsDiscussion).unwrap();
        assert_eq!(json, "\"needs_discussion\"");
        assert_eq!(ModerationState::NeedsDiscussion.as_str(), "needs_discussion");
    }

    #[test]
    fn test_rejection_reason_serialization() {
        let json = serde_json::to_value(RejectionReason::Guardian("too personal".to_string())).unwrap();
        assert_eq!(json["kind"], "guardian");
        assert_eq!(json["detail"], "too personal");

        let json = serde_json::to_value(RejectionReason::EscalatedRepeatedConcern).unwrap();
        assert_eq!(json["kind"], "escalatedRepeatedConcern");
    }

    #[test]
    fn test_submission_deserialization_without_score() {
        let json = r#"{"submitterId": "child-1", "contentType": "profile_update"}"#;
        let submission: Submission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.content_type, ContentType::ProfileUpdate);
        assert!(submission.ai_risk_score.is_none());
        assert_eq!(submission.effective_score(), FAIL_SAFE_RISK_SCORE);
    }
}
