//! Feature compliance assessment
//!
//! Pre-screens platform features against ethical, legal and risk criteria
//! before they are offered to children. Assessment is a pure function of
//! the [`FeatureDescriptor`]; the [`AssessmentRegistry`] keeps a versioned,
//! append-only history of results.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assessor;
pub mod descriptor;
pub mod registry;

pub use assessor::{
    AgeScopedAssessment, AssessmentResult, FeatureComplianceAssessor, FlaggedRisk, Modification,
};
pub use descriptor::{
    EthicalAttributes, FeatureDescriptor, LegalAttributes, RiskDimension, RiskLevel, RiskProfile,
};
pub use registry::{feature_subject_id, AssessmentRegistry, VersionedAssessment};

use policy_log::StoreError;
use thiserror::Error;

/// Errors that can occur during compliance operations
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// Descriptor cannot be assessed
    #[error("Invalid feature descriptor: {0}")]
    InvalidDescriptor(String),

    /// Feature has exhausted its version numbers
    #[error("Version limit reached for feature: {0}")]
    VersionLimit(String),

    /// Age-based consent lookup failed
    #[error("Consent policy error: {0}")]
    Consent(#[from] consent::ConsentError),

    /// Event log failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for compliance operations
pub type Result<T> = std::result::Result<T, ComplianceError>;
