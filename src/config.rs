//! Top-level engine configuration
//!
//! Loaded from JSON, e.g.
//!
//! ```json
//! {
//!   "moderation": { "autoApproveBelow": 20, "discussionAtOrAbove": 50 },
//!   "storage": { "path": "/var/lib/trust-safety/db" },
//!   "logFilter": "info,moderation=debug"
//! }
//! ```

use crate::{Result, TrustSafetyError};
use moderation::{ContentFilterLevel, ModerationConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use storage::KvConfig;

fn default_log_filter() -> String {
    "info".to_string()
}

/// Configuration for every engine component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustSafetyConfig {
    /// Routing thresholds
    #[serde(default)]
    pub moderation: ModerationConfig,
    /// Durable storage; `None` keeps everything in memory
    #[serde(default)]
    pub storage: Option<KvConfig>,
    /// Fallback `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TrustSafetyConfig {
    fn default() -> Self {
        Self {
            moderation: ModerationConfig::default(),
            storage: None,
            log_filter: default_log_filter(),
        }
    }
}

impl TrustSafetyConfig {
    /// Create an in-memory configuration with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Use the thresholds of a filter level
    pub fn with_filter_level(mut self, level: ContentFilterLevel) -> Self {
        self.moderation = ModerationConfig::for_filter_level(level);
        self
    }

    /// Replace the routing thresholds
    pub fn with_moderation(mut self, moderation: ModerationConfig) -> Self {
        self.moderation = moderation;
        self
    }

    /// Persist state with sled
    pub fn with_storage(mut self, storage: KvConfig) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the fallback log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Check thresholds and storage settings
    pub fn validate(&self) -> Result<()> {
        self.moderation.validate()?;
        if let Some(storage) = &self.storage {
            if storage.path.trim().is_empty() {
                return Err(TrustSafetyError::InvalidConfig(
                    "storage path is empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
