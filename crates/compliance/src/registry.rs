//! Versioned assessment history
//!
//! Descriptors are immutable once assessed. Assessing a feature again
//! appends a new version; earlier versions are never changed.

use crate::assessor::{AssessmentResult, FeatureComplianceAssessor};
use crate::descriptor::FeatureDescriptor;
use crate::{ComplianceError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use policy_log::{Actor, PolicyAction, PolicyEventLog};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// One recorded assessment of a feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedAssessment {
    /// Feature name
    pub feature: String,
    /// 1-based version, increasing per feature
    pub version: u32,
    /// Descriptor as assessed
    pub descriptor: FeatureDescriptor,
    /// Assessment outcome
    pub result: AssessmentResult,
    /// When the assessment ran
    pub assessed_at: DateTime<Utc>,
}

/// Event log subject for a feature, kept apart from child and family ids
pub fn feature_subject_id(feature: &str) -> String {
    format!("feature:{}", feature)
}

fn next_version(feature: &str, existing: usize) -> Result<u32> {
    existing
        .checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ComplianceError::VersionLimit(feature.to_string()))
}

/// Append-only store of feature assessments
pub struct AssessmentRegistry {
    assessor: FeatureComplianceAssessor,
    history: RwLock<HashMap<String, Vec<VersionedAssessment>>>,
    log: PolicyEventLog,
}

impl AssessmentRegistry {
    /// Create a registry that records assessments to `log`
    pub fn new(log: PolicyEventLog) -> Self {
        Self {
            assessor: FeatureComplianceAssessor::new(),
            history: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Assess a descriptor and store the result as a new version
    pub fn record(&self, descriptor: FeatureDescriptor) -> Result<VersionedAssessment> {
        if descriptor.name.trim().is_empty() {
            return Err(ComplianceError::InvalidDescriptor("feature name is empty".to_string()));
        }

        let result = self.assessor.assess(&descriptor);
        let mut history = self.history.write();
        let versions = history.entry(descriptor.name.clone()).or_default();

        let version = next_version(&descriptor.name, versions.len())?;
        let assessment = VersionedAssessment {
            feature: descriptor.name.clone(),
            version,
            descriptor,
            result,
            assessed_at: Utc::now(),
        };

        self.log.record(
            Actor::System,
            &feature_subject_id(&assessment.feature),
            PolicyAction::FeatureAssessed,
            json!({
                "version": assessment.version,
                "recommended": assessment.result.recommended,
                "modifications": assessment.result.modifications,
                "risks": assessment.result.risks,
            }),
        )?;
        versions.push(assessment.clone());

        if assessment.result.recommended {
            tracing::info!(feature = %assessment.feature, version = assessment.version, "feature recommended");
        } else {
            tracing::warn!(feature = %assessment.feature, version = assessment.version, "feature not recommended");
        }

        Ok(assessment)
    }

    /// Every version for a feature, oldest first
    pub fn history(&self, feature: &str) -> Vec<VersionedAssessment> {
        self.history.read().get(feature).cloned().unwrap_or_default()
    }

    /// Most recent version for a feature
    pub fn latest(&self, feature: &str) -> Option<VersionedAssessment> {
        self.history.read().get(feature).and_then(|v| v.last().cloned())
    }

    /// Names of features whose latest assessment is recommended
    pub fn recommended_features(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .history
            .read()
            .iter()
            .filter(|(_, versions)| versions.last().is_some_and(|a| a.result.recommended))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
