//! Age-appropriate consent presentation
//!
//! Maps a child's age to how consent must be collected and withdrawn.
//! Brackets are inclusive-low/exclusive-high; the top bracket is unbounded.

use crate::{ConsentError, Result};
use serde::{Deserialize, Serialize};

/// Age brackets with distinct consent requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgeBracket {
    /// Ages 0 to 7
    UnderEight,
    /// Ages 8 to 12
    EightToTwelve,
    /// Ages 13 to 15
    ThirteenToFifteen,
    /// Ages 16 and over
    SixteenPlus,
}

impl AgeBracket {
    /// Brackets in ascending age order
    pub const ALL: [AgeBracket; 4] = [
        AgeBracket::UnderEight,
        AgeBracket::EightToTwelve,
        AgeBracket::ThirteenToFifteen,
        AgeBracket::SixteenPlus,
    ];

    /// Inclusive lower bound and exclusive upper bound (`None` = unbounded)
    pub fn range(&self) -> (u32, Option<u32>) {
        match self {
            Self::UnderEight => (0, Some(8)),
            Self::EightToTwelve => (8, Some(13)),
            Self::ThirteenToFifteen => (13, Some(16)),
            Self::SixteenPlus => (16, None),
        }
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderEight => "<8",
            Self::EightToTwelve => "8-12",
            Self::ThirteenToFifteen => "13-15",
            Self::SixteenPlus => "16+",
        }
    }

    /// Check if an age falls inside this bracket
    pub fn contains(&self, age: u32) -> bool {
        let (low, high) = self.range();
        age >= low && high.map_or(true, |h| age < h)
    }

    /// Bracket for a non-negative age
    pub fn for_age(age: u32) -> AgeBracket {
        // SixteenPlus is unbounded above, so the fallback is only reached for it
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.contains(age))
            .unwrap_or(AgeBracket::SixteenPlus)
    }
}

/// How the consent request is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentPresentation {
    /// Pictures and icons, no reading required
    Visual,
    /// Short plain-language text
    SimplifiedText,
    /// Consent explained through an interactive game
    InteractiveGame,
}

/// How previously given consent is withdrawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalMechanism {
    /// The child can switch it off directly
    SimpleToggle,
    /// A guardian must make the request
    ParentRequest,
}

/// Consent requirements for one age bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeConsentMechanism {
    /// Bracket these requirements apply to
    pub bracket: AgeBracket,
    /// Presentation style
    pub consent_type: ConsentPresentation,
    /// Whether a guardian must approve
    pub parental_approval_required: bool,
    /// How consent is withdrawn
    pub withdrawal_mechanism: WithdrawalMechanism,
    /// Explanation shown alongside the request
    pub explanation: String,
}

impl AgeConsentMechanism {
    fn for_bracket(bracket: AgeBracket) -> Self {
        let (consent_type, parental_approval_required, withdrawal_mechanism, explanation) =
            match bracket {
                AgeBracket::UnderEight => (
                    ConsentPresentation::Visual,
                    true,
                    WithdrawalMechanism::ParentRequest,
                    "Your grown-up decides this with you",
                ),
                AgeBracket::EightToTwelve => (
                    ConsentPresentation::InteractiveGame,
                    true,
                    WithdrawalMechanism::ParentRequest,
                    "Learn what this does, then ask your parent to say yes",
                ),
                AgeBracket::ThirteenToFifteen => (
                    ConsentPresentation::SimplifiedText,
                    true,
                    WithdrawalMechanism::SimpleToggle,
                    "Read what we collect; a parent also needs to agree",
                ),
                AgeBracket::SixteenPlus => (
                    ConsentPresentation::SimplifiedText,
                    false,
                    WithdrawalMechanism::SimpleToggle,
                    "Read what we collect and choose for yourself",
                ),
            };

        Self {
            bracket,
            consent_type,
            parental_approval_required,
            withdrawal_mechanism,
            explanation: explanation.to_string(),
        }
    }
}

/// Resolves consent requirements by age
#[derive(Debug, Clone, Copy, Default)]
pub struct AgeConsentPolicy;

impl AgeConsentPolicy {
    /// Create the policy
    pub fn new() -> Self {
        Self
    }

    /// Consent requirements for an age
    ///
    /// Total over every non-negative age; negative ages fail with
    /// [`ConsentError::InvalidAge`].
    pub fn resolve(&self, age: i32) -> Result<AgeConsentMechanism> {
        let age = u32::try_from(age).map_err(|_| ConsentError::InvalidAge(age))?;
        Ok(AgeConsentMechanism::for_bracket(AgeBracket::for_age(age)))
    }

    /// Requirements for every bracket, youngest first
    pub fn brackets(&self) -> Vec<AgeConsentMechanism> {
        AgeBracket::ALL
            .iter()
            .map(|b| AgeConsentMechanism::for_bracket(*b))
            .collect()
    }
}
