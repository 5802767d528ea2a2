//! Declarative feature descriptors

use serde::{Deserialize, Serialize};

/// Ethical properties of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthicalAttributes {
    /// The feature serves the child's own interest
    pub benefits_child: bool,
    /// The child can understand and influence how the feature treats them
    pub respects_autonomy: bool,
    /// Data use is proportionate to the purpose
    pub proportionate: bool,
    /// The feature's behavior is explained to the family
    pub transparent: bool,
}

/// Legal properties of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalAttributes {
    /// Processing meets GDPR requirements
    pub gdpr_compliant: bool,
    /// Processing meets COPPA requirements
    pub coppa_compliant: bool,
    /// Processing needs guardian consent
    pub requires_consent: bool,
    /// A human reviews automated decisions
    pub human_oversight: bool,
}

/// Severity of one risk dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Negligible
    #[default]
    Low,
    /// Needs mitigation
    Medium,
    /// Needs redesign or strong safeguards
    High,
}

impl RiskLevel {
    /// Whether this level is reported as a risk
    pub fn is_flagged(&self) -> bool {
        !matches!(self, RiskLevel::Low)
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Risk dimensions, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskDimension {
    /// Exposure of private information
    PrivacyInvasion,
    /// Harm to the child's wellbeing
    PsychologicalHarm,
    /// Unfair treatment of groups of children
    Discrimination,
    /// Monitoring beyond what the child would expect
    Surveillance,
}

impl RiskDimension {
    /// Dimensions in the fixed reporting order
    pub const ALL: [RiskDimension; 4] = [
        RiskDimension::PrivacyInvasion,
        RiskDimension::PsychologicalHarm,
        RiskDimension::Discrimination,
        RiskDimension::Surveillance,
    ];

    /// Wire name of the dimension
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivacyInvasion => "privacyInvasion",
            Self::PsychologicalHarm => "psychologicalHarm",
            Self::Discrimination => "discrimination",
            Self::Surveillance => "surveillance",
        }
    }
}

/// Risk rating per dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    /// Privacy invasion risk
    #[serde(default)]
    pub privacy_invasion: RiskLevel,
    /// Psychological harm risk
    #[serde(default)]
    pub psychological_harm: RiskLevel,
    /// Discrimination risk
    #[serde(default)]
    pub discrimination: RiskLevel,
    /// Surveillance risk
    #[serde(default)]
    pub surveillance: RiskLevel,
}

impl RiskProfile {
    /// Rating for one dimension
    pub fn level(&self, dimension: RiskDimension) -> RiskLevel {
        match dimension {
            RiskDimension::PrivacyInvasion => self.privacy_invasion,
            RiskDimension::PsychologicalHarm => self.psychological_harm,
            RiskDimension::Discrimination => self.discrimination,
            RiskDimension::Surveillance => self.surveillance,
        }
    }
}

/// Everything the assessor needs to know about a feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    /// Feature name, e.g. "Real-time activity feed"
    pub name: String,
    /// Ethical properties
    pub ethical: EthicalAttributes,
    /// Legal properties
    pub legal: LegalAttributes,
    /// Risk ratings
    #[serde(default)]
    pub risks: RiskProfile,
}

impl FeatureDescriptor {
    /// Create a descriptor with every attribute false and every risk low
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ethical: EthicalAttributes::default(),
            legal: LegalAttributes::default(),
            risks: RiskProfile::default(),
        }
    }

    /// Set the ethical attributes
    pub fn with_ethical(mut self, ethical: EthicalAttributes) -> Self {
        self.ethical = ethical;
        self
    }

    /// Set the legal attributes
    pub fn with_legal(mut self, legal: LegalAttributes) -> Self {
        self.legal = legal;
        self
    }

    /// Set the risk profile
    pub fn with_risks(mut self, risks: RiskProfile) -> Self {
        self.risks = risks;
        self
    }
}
