//! Durable Storage Integration Tests
//!
//! Engine state written through sled must survive a restart.

use tempfile::TempDir;
use trust_safety::consent::{Capability, LawfulBasis};
use trust_safety::moderation::{ContentType, ModerationState, Submission};
use trust_safety::policy_log::PolicyAction;
use trust_safety::storage::KvConfig;
use trust_safety::{TrustSafety, TrustSafetyConfig};

fn config(dir: &TempDir) -> TrustSafetyConfig {
    TrustSafetyConfig::default().with_storage(
        KvConfig::new(dir.path().join("trust_safety.db").to_string_lossy().to_string())
            .flush_every_ms(None),
    )
}

/// Consent, items and events are all restored after reopening
#[test]
fn test_state_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let pending_id;

    // Phase 1: record consent and moderate some content
    {
        let engine = TrustSafety::open(config(&temp_dir)).unwrap();
        assert!(engine.is_durable());

        engine.consent().register_subject("child-1").unwrap();
        engine
            .consent()
            .grant("child-1", Capability::ActivityAnalysis, LawfulBasis::Consent)
            .unwrap();

        engine
            .moderation()
            .submit(Submission::new("child-1", ContentType::Image).with_score(5.0))
            .unwrap();
        let pending = engine
            .moderation()
            .submit(Submission::new("child-1", ContentType::Video).with_score(50.0))
            .unwrap();
        pending_id = pending.id;

        engine.flush().unwrap();
    }

    // Phase 2: reopen and continue where we left off
    {
        let engine = TrustSafety::open(config(&temp_dir)).unwrap();

        assert!(engine.consent().is_granted("child-1", Capability::ActivityAnalysis));
        assert!(!engine.consent().is_granted("child-1", Capability::LocationTracking));
        assert_eq!(engine.consent().records("child-1").unwrap().len(), 8);

        let stats = engine.moderation().stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.auto_approved, 1);
        assert_eq!(stats.pending, 1);

        let approved = engine.moderation().approve(&pending_id, "parent-1").unwrap();
        assert_eq!(approved.state, ModerationState::Approved);
        assert_eq!(
            engine.moderation().state_path(&pending_id).unwrap(),
            vec![ModerationState::Pending, ModerationState::Approved]
        );

        let actions: Vec<PolicyAction> = engine
            .events()
            .for_subject("child-1")
            .unwrap()
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                PolicyAction::SubjectRegistered,
                PolicyAction::ConsentGranted,
                PolicyAction::ItemSubmitted,
                PolicyAction::ItemStateChanged,
                PolicyAction::ItemSubmitted,
                PolicyAction::ItemStateChanged,
            ]
        );
    }
}

/// Revocation is durable too
#[test]
fn test_revocation_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = TrustSafety::open(config(&temp_dir)).unwrap();
        engine
            .consent()
            .grant("child-2", Capability::MarketingEmails, LawfulBasis::Consent)
            .unwrap();
        engine.consent().revoke("child-2", Capability::MarketingEmails).unwrap();
        engine.flush().unwrap();
    }

    let engine = TrustSafety::open(config(&temp_dir)).unwrap();
    let record = engine.consent().record("child-2", Capability::MarketingEmails).unwrap();
    assert!(!record.granted);
    assert!(record.granted_at.is_none());
    assert_eq!(
        engine
            .events()
            .for_subject_action("child-2", PolicyAction::ConsentRevoked)
            .unwrap()
            .len(),
        1
    );
}

/// Config files select durable storage
#[test]
fn test_open_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("from_file.db");
    let config_path = temp_dir.path().join("trust_safety.json");
    std::fs::write(
        &config_path,
        serde_json::json!({
            "moderation": { "autoApproveBelow": 40, "discussionAtOrAbove": 80 },
            "storage": { "path": db_path.to_string_lossy() }
        })
        .to_string(),
    )
    .unwrap();

    let config = TrustSafetyConfig::from_file(&config_path).unwrap();
    let engine = TrustSafety::from_config(config).unwrap();
    assert!(engine.is_durable());
    assert_eq!(engine.config().moderation.auto_approve_below, 40.0);

    engine
        .consent()
        .grant("child-3", Capability::ActivityAnalysis, LawfulBasis::Consent)
        .unwrap();
    let item = engine
        .moderation()
        .submit(Submission::new("child-3", ContentType::Comment).with_score(35.0))
        .unwrap();
    assert_eq!(item.state, ModerationState::Approved);
}
