//! Trust & safety decision engine
//!
//! Wires the consent ledger, moderation engine, compliance assessor and
//! policy event log into one [`TrustSafety`] handle sharing a single audit
//! log. State lives in memory or, when storage is configured, in sled.
//!
//! # Example
//!
//! ```rust
//! use trust_safety::{TrustSafety, TrustSafetyConfig};
//! use trust_safety::consent::{Capability, LawfulBasis};
//! use trust_safety::moderation::{ContentType, ModerationState, Submission};
//!
//! let engine = TrustSafety::in_memory(TrustSafetyConfig::default()).unwrap();
//! engine
//!     .consent()
//!     .grant("child-1", Capability::ActivityAnalysis, LawfulBasis::Consent)
//!     .unwrap();
//!
//! let item = engine
//!     .moderation()
//!     .submit(Submission::new("child-1", ContentType::Image).with_score(12.0))
//!     .unwrap();
//! assert_eq!(item.state, ModerationState::Approved);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;

pub use compliance;
pub use consent;
pub use moderation;
pub use policy_log;
pub use storage;

pub use config::TrustSafetyConfig;

use compliance::{AssessmentRegistry, FeatureComplianceAssessor};
use consent::{AgeConsentPolicy, ConsentLedger};
use moderation::ModerationDecisionEngine;
use policy_log::{PolicyEventLog, SubjectExport};
use std::sync::Arc;
use storage::{KvBackends, KvStore};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while configuring or opening the engine
#[derive(Debug, Error)]
pub enum TrustSafetyError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config document is not valid JSON for the expected shape
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config values are unusable
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Moderation setup failed
    #[error("Moderation error: {0}")]
    Moderation(#[from] moderation::ModerationError),

    /// Durable store could not be opened or flushed
    #[error("Storage error: {0}")]
    Storage(#[from] storage::KvError),

    /// Event log failure
    #[error("Store error: {0}")]
    Store(#[from] policy_log::StoreError),
}

/// Result type for engine setup
pub type Result<T> = std::result::Result<T, TrustSafetyError>;

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` wins over `filter`. Returns `false` when a subscriber was
/// already installed.
pub fn init_tracing(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .with_target(true)
        .try_init()
        .is_ok()
}

/// `RUST_LOG` if set and valid, else `fallback`, else `info`
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Every engine component over one shared event log
pub struct TrustSafety {
    config: TrustSafetyConfig,
    log: PolicyEventLog,
    ledger: Arc<ConsentLedger>,
    engine: ModerationDecisionEngine,
    assessor: FeatureComplianceAssessor,
    registry: AssessmentRegistry,
    age_policy: AgeConsentPolicy,
    kv: Option<Arc<KvStore>>,
}

impl TrustSafety {
    /// Open the engine described by `config`
    ///
    /// Installs logging with the configured `log_filter` unless a
    /// subscriber is already set, then uses sled when storage is
    /// configured and memory otherwise.
    pub fn from_config(config: TrustSafetyConfig) -> Result<Self> {
        init_tracing(&config.log_filter);
        if config.storage.is_some() {
            Self::open(config)
        } else {
            Self::in_memory(config)
        }
    }

    /// Build an engine that keeps all state in memory
    pub fn in_memory(config: TrustSafetyConfig) -> Result<Self> {
        config.validate()?;
        let log = PolicyEventLog::in_memory();
        let ledger = Arc::new(ConsentLedger::in_memory(log.clone()));
        let engine = ModerationDecisionEngine::new(
            config.moderation.clone(),
            Arc::new(moderation::InMemoryModerationRepository::new()),
            ledger.clone(),
            log.clone(),
        )?;

        tracing::info!("trust & safety engine started in memory");
        Ok(Self::assemble(config, log, ledger, engine, None))
    }

    /// Build an engine persisted in sled
    pub fn open(config: TrustSafetyConfig) -> Result<Self> {
        config.validate()?;
        let kv_config = config.storage.clone().ok_or_else(|| {
            TrustSafetyError::InvalidConfig("no storage configured".to_string())
        })?;

        let kv = Arc::new(KvStore::new(&kv_config)?);
        let backends = KvBackends::new(kv.clone());
        let log = PolicyEventLog::new(backends.events);
        let ledger = Arc::new(ConsentLedger::new(backends.consent, log.clone()));
        let engine = ModerationDecisionEngine::new(
            config.moderation.clone(),
            backends.moderation,
            ledger.clone(),
            log.clone(),
        )?;

        tracing::info!(path = %kv_config.path, events = log.len()?, "trust & safety engine opened");
        Ok(Self::assemble(config, log, ledger, engine, Some(kv)))
    }

    fn assemble(
        config: TrustSafetyConfig,
        log: PolicyEventLog,
        ledger: Arc<ConsentLedger>,
        engine: ModerationDecisionEngine,
        kv: Option<Arc<KvStore>>,
    ) -> Self {
        Self {
            config,
            registry: AssessmentRegistry::new(log.clone()),
            log,
            ledger,
            engine,
            assessor: FeatureComplianceAssessor::new(),
            age_policy: AgeConsentPolicy::new(),
            kv,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &TrustSafetyConfig {
        &self.config
    }

    /// Consent ledger
    pub fn consent(&self) -> &ConsentLedger {
        &self.ledger
    }

    /// Shared handle to the consent ledger
    pub fn consent_handle(&self) -> Arc<ConsentLedger> {
        self.ledger.clone()
    }

    /// Moderation decision engine
    pub fn moderation(&self) -> &ModerationDecisionEngine {
        &self.engine
    }

    /// Stateless feature assessor
    pub fn assessor(&self) -> &FeatureComplianceAssessor {
        &self.assessor
    }

    /// Versioned assessment history
    pub fn assessments(&self) -> &AssessmentRegistry {
        &self.registry
    }

    /// Age-based consent rules
    pub fn age_policy(&self) -> &AgeConsentPolicy {
        &self.age_policy
    }

    /// Shared audit log
    pub fn events(&self) -> &PolicyEventLog {
        &self.log
    }

    /// Every event about one subject, ready for handover
    pub fn export_subject(&self, subject_id: &str) -> Result<SubjectExport> {
        Ok(self.log.export_subject(subject_id)?)
    }

    /// Whether state survives a restart
    pub fn is_durable(&self) -> bool {
        self.kv.is_some()
    }

    /// Write buffered state to disk; a no-op in memory
    pub fn flush(&self) -> Result<()> {
        if let Some(kv) = &self.kv {
            kv.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent::{Capability, LawfulBasis};
    use moderation::{ContentType, ModerationState, Submission};
    use policy_log::PolicyAction;
    use storage::KvConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));
    }

    #[test]
    fn test_env_filter_falls_back_to_configured_filter() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert_eq!(env_filter("warn").to_string(), "warn");
    }

    #[test]
    fn test_from_config_installs_logging() {
        let config = TrustSafetyConfig::default().with_log_filter("warn");
        let engine = TrustSafety::from_config(config).unwrap();
        assert!(!engine.is_durable());
        assert!(!init_tracing("info"));
    }

    #[test]
    fn test_in_memory_shares_one_log() {
        let engine = TrustSafety::in_memory(TrustSafetyConfig::default()).unwrap();
        assert!(!engine.is_durable());

        engine
            .consent()
            .grant("child-1", Capability::ActivityAnalysis, LawfulBasis::Consent)
            .unwrap();
        engine
            .moderation()
            .submit(Submission::new("child-1", ContentType::Comment).with_score(5.0))
            .unwrap();

        let events = engine.events().for_subject("child-1").unwrap();
        let actions: Vec<PolicyAction> = events.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                PolicyAction::ConsentGranted,
                PolicyAction::ItemSubmitted,
                PolicyAction::ItemStateChanged,
            ]
        );
        assert_eq!(engine.export_subject("child-1").unwrap().event_count, 3);
        engine.flush().unwrap();
    }

    #[test]
    fn test_config_thresholds_reach_engine() {
        let config = TrustSafetyConfig::default()
            .with_filter_level(moderation::ContentFilterLevel::Strict);
        let engine = TrustSafety::in_memory(config).unwrap();
        engine
            .consent()
            .grant("child-1", Capability::ActivityAnalysis, LawfulBasis::Consent)
            .unwrap();

        let item = engine
            .moderation()
            .submit(Submission::new("child-1", ContentType::Image).with_score(55.0))
            .unwrap();
        assert_eq!(item.state, ModerationState::NeedsDiscussion);
    }

    #[test]
    fn test_open_requires_storage() {
        let err = TrustSafety::open(TrustSafetyConfig::default()).err().unwrap();
        assert!(matches!(err, TrustSafetyError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_config_picks_backend() {
        let dir = TempDir::new().unwrap();
        let config = TrustSafetyConfig::default().with_storage(
            KvConfig::new(dir.path().join("db").to_string_lossy().to_string()),
        );

        let engine = TrustSafety::from_config(config).unwrap();
        assert!(engine.is_durable());
        engine.flush().unwrap();
    }
}
