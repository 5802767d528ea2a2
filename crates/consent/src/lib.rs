//! Consent management for child data processing
//!
//! This crate tracks, per child or family, which data-processing
//! capabilities a guardian has granted, and decides how consent must be
//! presented for a given age.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod age_policy;
pub mod capability;
pub mod ledger;
pub mod repository;

pub use age_policy::{
    AgeBracket, AgeConsentMechanism, AgeConsentPolicy, ConsentPresentation, WithdrawalMechanism,
};
pub use capability::{Capability, ConsentRecord, LawfulBasis};
pub use ledger::{ConsentCheck, ConsentLedger};
pub use repository::{ConsentRepository, InMemoryConsentRepository};

use policy_log::StoreError;
use thiserror::Error;

/// Errors that can occur during consent operations
#[derive(Debug, Error)]
pub enum ConsentError {
    /// Capability name is not one the platform knows
    #[error("Invalid capability: {0}")]
    InvalidCapability(String),

    /// The essential capability cannot be revoked
    #[error("Essential capability is always granted and cannot be changed")]
    EssentialCapabilityImmutable,

    /// Age outside the supported range
    #[error("Invalid age: {0}")]
    InvalidAge(i32),

    /// Repository or event log failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for consent operations
pub type Result<T> = std::result::Result<T, ConsentError>;
