//! Policy event types
//!
//! A [`PolicyEvent`] is an immutable audit record. The `payload` is opaque to
//! the log itself; producers decide what goes in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who triggered a recorded change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Actor {
    /// The platform itself (automatic routing, defaults)
    System,
    /// A guardian acting on behalf of a child
    Guardian(String),
    /// The child or family the record is about
    Subject(String),
}

impl Actor {
    /// Create a guardian actor
    pub fn guardian(id: impl Into<String>) -> Self {
        Self::Guardian(id.into())
    }

    /// Check if this is the system actor
    pub fn is_system(&self) -> bool {
        matches!(self, Actor::System)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::System => write!(f, "system"),
            Actor::Guardian(id) => write!(f, "guardian:{}", id),
            Actor::Subject(id) => write!(f, "subject:{}", id),
        }
    }
}

/// Kind of change an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// Consent records were created for a new subject
    SubjectRegistered,
    /// A capability was granted
    ConsentGranted,
    /// A capability was revoked
    ConsentRevoked,
    /// A content item entered moderation
    ItemSubmitted,
    /// A content item moved between moderation states
    ItemStateChanged,
    /// A platform feature was assessed for compliance
    FeatureAssessed,
}

impl PolicyAction {
    /// Stable string form, matching the serialized value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubjectRegistered => "subject_registered",
            Self::ConsentGranted => "consent_granted",
            Self::ConsentRevoked => "consent_revoked",
            Self::ItemSubmitted => "item_submitted",
            Self::ItemStateChanged => "item_state_changed",
            Self::FeatureAssessed => "feature_assessed",
        }
    }
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEvent {
    /// When the change was applied
    pub timestamp: DateTime<Utc>,
    /// Who triggered it
    pub actor: Actor,
    /// Child, family or feature the change concerns
    pub subject_id: String,
    /// What happened
    pub action: PolicyAction,
    /// Producer-defined detail
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl PolicyEvent {
    /// Create an event stamped with the current time
    pub fn new(
        actor: Actor,
        subject_id: impl Into<String>,
        action: PolicyAction,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor,
            subject_id: subject_id.into(),
            action,
            payload,
        }
    }

    /// Read a string field from the payload
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actor_display() {
        assert_eq!(Actor::System.to_string(), "system");
        assert_eq!(Actor::guardian("g1").to_string(), "guardian:g1");
        assert_eq!(Actor::Subject("c1".to_string()).to_string(), "subject:c1");
    }

    #[test]
    fn test_actor_serialization() {
        let json = serde_json::to_value(Actor::guardian("g1")).unwrap();
        assert_eq!(json, json!({"kind": "guardian", "id": "g1"}));

        let json = serde_json::to_value(Actor::System).unwrap();
        assert_eq!(json, json!({"kind": "system"}));

        let actor: Actor = serde_json::from_value(json!({"kind": "guardian", "id": "g2"})).unwrap();
        assert_eq!(actor, Actor::guardian("g2"));
    }

    #[test]
    fn test_action_as_str_matches_serde() {
        for action in [
            PolicyAction::SubjectRegistered,
            PolicyAction::ConsentGranted,
            PolicyAction::ConsentRevoked,
            PolicyAction::ItemSubmitted,
            PolicyAction::ItemStateChanged,
            PolicyAction::FeatureAssessed,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_payload_str() {
        let event = PolicyEvent::new(
            Actor::System,
            "child-1",
            PolicyAction::ItemStateChanged,
            json!({"itemId": "item-1", "count": 2}),
        );
        assert_eq!(event.payload_str("itemId"), Some("item-1"));
        assert_eq!(event.payload_str("count"), None);
        assert_eq!(event.payload_str("missing"), None);
    }
}
