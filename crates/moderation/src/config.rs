//! Moderation routing configuration

use crate::{ModerationError, Result};
use serde::{Deserialize, Serialize};

/// How cautious routing should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFilterLevel {
    /// Fewer auto-approvals, earlier discussion
    Strict,
    /// Platform defaults
    #[default]
    Moderate,
    /// More auto-approvals, later discussion
    Relaxed,
}

/// Thresholds used to route scored submissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationConfig {
    /// Scores below this are approved automatically
    #[serde(default = "default_auto_approve_below")]
    pub auto_approve_below: f64,
    /// Scores at or above this go straight to discussion
    #[serde(default = "default_discussion_at_or_above")]
    pub discussion_at_or_above: f64,
    /// Returns from discussion allowed before the next one forces rejection
    #[serde(default = "default_max_discussion_returns")]
    pub max_discussion_returns: u32,
}

fn default_auto_approve_below() -> f64 {
    30.0
}

fn default_discussion_at_or_above() -> f64 {
    70.0
}

fn default_max_discussion_returns() -> u32 {
    3
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            auto_approve_below: default_auto_approve_below(),
            discussion_at_or_above: default_discussion_at_or_above(),
            max_discussion_returns: default_max_discussion_returns(),
        }
    }
}

impl ModerationConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Thresholds for a filter level
    pub fn for_filter_level(level: ContentFilterLevel) -> Self {
        let (auto_approve_below, discussion_at_or_above) = match level {
            ContentFilterLevel::Strict => (20.0, 50.0),
            ContentFilterLevel::Moderate => (30.0, 70.0),
            ContentFilterLevel::Relaxed => (40.0, 80.0),
        };
        Self { auto_approve_below, discussion_at_or_above, ..Self::default() }
    }

    /// Set the auto-approval threshold
    pub fn auto_approve_below(mut self, score: f64) -> Self {
        self.auto_approve_below = score;
        self
    }

    /// Set the discussion threshold
    pub fn discussion_at_or_above(mut self, score: f64) -> Self {
        self.discussion_at_or_above = score;
        self
    }

    /// Set the number of returns from discussion before escalation
    pub fn max_discussion_returns(mut self, returns: u32) -> Self {
        self.max_discussion_returns = returns;
        self
    }

    /// Check that thresholds are ordered and inside 0..=100
    pub fn validate(&self) -> Result<()> {
        let low = self.auto_approve_below;
        let high = self.discussion_at_or_above;
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) {
            return Err(ModerationError::InvalidConfig(format!(
                "thresholds must be within 0..=100 (got {} and {})",
                low, high
            )));
        }
        if low > high {
            return Err(ModerationError::InvalidConfig(format!(
                "auto-approve threshold {} is above discussion threshold {}",
                low, high
            )));
        }
        if self.max_discussion_returns == 0 {
            return Err(ModerationError::InvalidConfig(
                "max discussion returns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModerationConfig::new();
        assert_eq!(config.auto_approve_below, 30.0);
        assert_eq!(config.discussion_at_or_above, 70.0);
        assert_eq!(config.max_discussion_returns, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filter_levels() {
        assert_eq!(
            ModerationConfig::for_filter_level(ContentFilterLevel::Moderate),
            ModerationConfig::default()
        );

        let strict = ModerationConfig::for_filter_level(ContentFilterLevel::Strict);
        assert_eq!(strict.auto_approve_below, 20.0);
        assert_eq!(strict.discussion_at_or_above, 50.0);

        let relaxed = ModerationConfig::for_filter_level(ContentFilterLevel::Relaxed);
        assert_eq!(relaxed.auto_approve_below, 40.0);
        assert!(relaxed.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        assert!(ModerationConfig::new().auto_approve_below(80.0).validate().is_err());
        assert!(ModerationConfig::new().discussion_at_or_above(120.0).validate().is_err());
        assert!(ModerationConfig::new().auto_approve_below(f64::NAN).validate().is_err());
        assert!(ModerationConfig::new().max_discussion_returns(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ModerationConfig = serde_json::from_str(r#"{"autoApproveBelow": 25}"#).unwrap();
        assert_eq!(config.auto_approve_below, 25.0);
        assert_eq!(config.discussion_at_or_above, 70.0);
        assert_eq!(config.max_discussion_returns, 3);
    }

    #[test]
    fn test_filter_level_serialization() {
        let level: ContentFilterLevel = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(level, ContentFilterLevel::Strict);
        assert!(serde_json::from_str::<ContentFilterLevel>("\"paranoid\"").is_err());
    }
}
