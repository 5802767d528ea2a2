//! Feature compliance assessor
//!
//! [`FeatureComplianceAssessor::assess`] is deterministic and side-effect
//! free. Every check runs; none short-circuits another.
//!
//! `recommended` is gated on `ethical.benefitsChild` and
//! `legal.gdprCompliant` only. The remaining checks are advisory and surface
//! through `modifications` and `risks`.

use crate::descriptor::{FeatureDescriptor, RiskDimension, RiskLevel};
use crate::Result;
use consent::{AgeConsentMechanism, AgeConsentPolicy};
use serde::{Deserialize, Serialize};

/// A change required before a feature should ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modification {
    /// The child has no meaningful control over the feature
    AutonomyControls,
    /// The feature collects or uses more than it needs
    DataMinimisation,
    /// Processing is not GDPR compliant
    GdprCompliance,
    /// Processing needs a consent flow
    ConsentManagement,
}

impl Modification {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::AutonomyControls => {
                "Add age-appropriate controls so the child can understand and adjust the feature"
            }
            Self::DataMinimisation => "Reduce data collection to what the feature strictly needs",
            Self::GdprCompliance => "Ensure GDPR compliance before offering the feature",
            Self::ConsentManagement => "Implement consent management for the data this feature uses",
        }
    }
}

impl std::fmt::Display for Modification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// A risk dimension rated medium or high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedRisk {
    /// Dimension the risk was rated in
    pub dimension: RiskDimension,
    /// Its rating
    pub level: RiskLevel,
}

impl FlaggedRisk {
    /// Human-readable description
    pub fn description(&self) -> String {
        format!("{} risk: {}", self.dimension.as_str(), self.level.as_str())
    }
}

impl std::fmt::Display for FlaggedRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// Outcome of assessing one descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    /// Whether the feature may be offered
    pub recommended: bool,
    /// Required changes, in check order
    pub modifications: Vec<Modification>,
    /// Flagged risks, in dimension order
    pub risks: Vec<FlaggedRisk>,
}

impl AssessmentResult {
    /// Check if a given modification was required
    pub fn requires(&self, modification: Modification) -> bool {
        self.modifications.contains(&modification)
    }

    /// Check if there is nothing to act on
    pub fn is_clean(&self) -> bool {
        self.recommended && self.modifications.is_empty() && self.risks.is_empty()
    }

    /// Modification descriptions, in order
    pub fn modification_messages(&self) -> Vec<String> {
        self.modifications.iter().map(|m| m.description().to_string()).collect()
    }

    /// Risk descriptions, in order
    pub fn risk_messages(&self) -> Vec<String> {
        self.risks.iter().map(|r| r.description()).collect()
    }
}

/// Assessment for a feature offered to a specific age
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeScopedAssessment {
    /// The age-independent result
    pub result: AssessmentResult,
    /// How consent must be collected, when the feature needs consent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_mechanism: Option<AgeConsentMechanism>,
}

/// Evaluates feature descriptors
#[derive(Debug, Clone, Default)]
pub struct FeatureComplianceAssessor {
    age_policy: AgeConsentPolicy,
}

impl FeatureComplianceAssessor {
    /// Create an assessor
    pub fn new() -> Self {
        Self::default()
    }

    /// Assess a feature
    pub fn assess(&self, descriptor: &FeatureDescriptor) -> AssessmentResult {
        let ethical = &descriptor.ethical;
        let legal = &descriptor.legal;

        let mut modifications = Vec::new();
        if !ethical.respects_autonomy {
            modifications.push(Modification::AutonomyControls);
        }
        if !ethical.proportionate {
            modifications.push(Modification::DataMinimisation);
        }
        if !legal.gdpr_compliant {
            modifications.push(Modification::GdprCompliance);
        }
        if legal.requires_consent {
            modifications.push(Modification::ConsentManagement);
        }

        let risks = RiskDimension::ALL
            .iter()
            .map(|d| FlaggedRisk { dimension: *d, level: descriptor.risks.level(*d) })
            .filter(|r| r.level.is_flagged())
            .collect();

        AssessmentResult {
            recommended: ethical.benefits_child && legal.gdpr_compliant,
            modifications,
            risks,
        }
    }

    /// Assess a feature for a child of the given age
    ///
    /// Fails with an invalid-age error for negative ages.
    pub fn assess_for_age(
        &self,
        descriptor: &FeatureDescriptor,
        age: i32,
    ) -> Result<AgeScopedAssessment> {
        let mechanism = self.age_policy.resolve(age)?;
        let result = self.assess(descriptor);
        let consent_mechanism = descriptor.legal.requires_consent.then_some(mechanism);

        Ok(AgeScopedAssessment { result, consent_mechanism })
    }
}
