//! Content moderation for child submissions
//!
//! This crate owns the lifecycle of submitted content: intake, routing on
//! the scanner's risk score, guardian review, discussion and terminal
//! disposition. Every transition is recorded in the policy event log.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod item;
pub mod repository;
pub mod stats;

pub use config::{ContentFilterLevel, ModerationConfig};
pub use engine::ModerationDecisionEngine;
pub use item::{
    ContentType, DiscussionReason, ModerationItem, ModerationState, RejectionReason, Submission,
    FAIL_SAFE_RISK_SCORE,
};
pub use repository::{InMemoryModerationRepository, ModerationRepository};
pub use stats::ModerationStats;

use policy_log::StoreError;
use thiserror::Error;

/// Errors that can occur during moderation
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The action is not allowed from the item's current state
    #[error("Invalid transition: cannot {action} item {item_id} while {state}")]
    InvalidTransition {
        /// Item the action targeted
        item_id: String,
        /// State the item was in
        state: ModerationState,
        /// Action that was attempted
        action: &'static str,
    },

    /// No item with this id
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// An item with this id already exists
    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),

    /// Routing thresholds are unusable
    #[error("Invalid moderation config: {0}")]
    InvalidConfig(String),

    /// Repository or event log failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for moderation operations
pub type Result<T> = std::result::Result<T, ModerationError>;
