//! Capabilities, lawful bases and consent records

use crate::{ConsentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A category of data processing a guardian can consent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// Processing required for the app to function at all
    Essential,
    /// Behavioral analysis of the child's activity, including AI risk scoring
    ActivityAnalysis,
    /// Content tailored to the child's interests
    PersonalizedContent,
    /// Device location
    LocationTracking,
    /// Marketing email to the family
    MarketingEmails,
    /// Aggregate analytics used to improve the product
    AnalyticsImprovement,
    /// Sharing with integrated third-party services
    ThirdPartyIntegrations,
    /// AI-driven recommendations
    AiRecommendations,
}

impl Capability {
    /// All capabilities, in display order
    pub const ALL: [Capability; 8] = [
        Capability::Essential,
        Capability::ActivityAnalysis,
        Capability::PersonalizedContent,
        Capability::LocationTracking,
        Capability::MarketingEmails,
        Capability::AnalyticsImprovement,
        Capability::ThirdPartyIntegrations,
        Capability::AiRecommendations,
    ];

    /// Wire name of the capability
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::ActivityAnalysis => "activityAnalysis",
            Self::PersonalizedContent => "personalizedContent",
            Self::LocationTracking => "locationTracking",
            Self::MarketingEmails => "marketingEmails",
            Self::AnalyticsImprovement => "analyticsImprovement",
            Self::ThirdPartyIntegrations => "thirdPartyIntegrations",
            Self::AiRecommendations => "aiRecommendations",
        }
    }

    /// Human-readable description for consent screens
    pub fn description(&self) -> &'static str {
        match self {
            Self::Essential => "Required for the app to work",
            Self::ActivityAnalysis => "Analyse activity to keep your child safe",
            Self::PersonalizedContent => "Suggest content based on interests",
            Self::LocationTracking => "Share device location with guardians",
            Self::MarketingEmails => "Send news and offers by email",
            Self::AnalyticsImprovement => "Use anonymous statistics to improve the app",
            Self::ThirdPartyIntegrations => "Connect with partner services",
            Self::AiRecommendations => "Recommend activities using AI",
        }
    }

    /// Check if this is the always-granted essential capability
    pub fn is_essential(&self) -> bool {
        matches!(self, Capability::Essential)
    }
}

impl FromStr for Capability {
    type Err = ConsentError;

    fn from_str(s: &str) -> Result<Self> {
        Capability::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ConsentError::InvalidCapability(s.to_string()))
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal justification for processing a capability's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawfulBasis {
    /// Explicit consent from the guardian
    #[default]
    Consent,
    /// Processing necessary for the service's legitimate interest
    LegitimateInterest,
    /// Processing needed to protect someone's life
    VitalInterest,
    /// Guardian acting under parental responsibility
    ParentalResponsibility,
}

/// Current grant state of one capability for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    /// Child or family identifier
    pub subject_id: String,
    /// Capability this record covers
    pub capability: Capability,
    /// Whether processing is currently permitted
    pub granted: bool,
    /// When the current grant was made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_at: Option<DateTime<Utc>>,
    /// Basis the processing relies on
    pub lawful_basis: LawfulBasis,
}

impl ConsentRecord {
    /// Default record for a subject that never changed this capability
    ///
    /// Essential is granted; everything else starts revoked.
    pub fn default_for(subject_id: impl Into<String>, capability: Capability) -> Self {
        if capability.is_essential() {
            Self {
                subject_id: subject_id.into(),
                capability,
                granted: true,
                granted_at: None,
                lawful_basis: LawfulBasis::LegitimateInterest,
            }
        } else {
            Self {
                subject_id: subject_id.into(),
                capability,
                granted: false,
                granted_at: None,
                lawful_basis: LawfulBasis::Consent,
            }
        }
    }
}
