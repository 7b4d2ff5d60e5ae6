//! Integration test: end-to-end verification runs across the factor,
//! crypto, store and engine crates.

mod common;

use agegate_core::{
    AttemptDetails, DocumentType, EngineConfig, FactorType, ProofToken, VerificationLevel,
    VerificationMethod,
};
use agegate_engine::{EngineError, VerificationOptions};
use agegate_factors::{
    DocumentOptions, FactorError, FileHandle, SimulatedDevice, SimulatedScorer,
};
use common::{flagged_device, temp_dir, FixedScorer, Harness};

fn method(method: VerificationMethod) -> VerificationOptions {
    VerificationOptions::new(method)
}

// =========================================================================
// Multi-factor fusion
// =========================================================================

#[tokio::test]
async fn test_device_settings_alone_reaches_basic() {
    let engine = Harness::new(flagged_device()).without_camera().open().await;

    let attempt = engine
        .start_verification(VerificationOptions::default())
        .await
        .expect("device factor alone should succeed");

    assert_eq!(attempt.method, VerificationMethod::MultiFactor);
    assert!((attempt.confidence - 0.8).abs() < 1e-9);
    assert_eq!(attempt.level, VerificationLevel::Basic);
    assert!(attempt.verified);
}

#[tokio::test]
async fn test_biometric_and_device_reach_standard() {
    let config = EngineConfig {
        device_settings_confidence: 0.9,
        ..Default::default()
    };
    let engine = Harness::new(flagged_device())
        .scorer(FixedScorer::adult(0.8))
        .config(config)
        .open()
        .await;

    let attempt = engine
        .start_verification(VerificationOptions::default())
        .await
        .unwrap();

    assert!((attempt.confidence - (0.8 * 0.4 + 0.9 * 0.3) / 0.7).abs() < 1e-9);
    assert_eq!(attempt.level, VerificationLevel::Standard);
    assert!(attempt.verified);
    match &attempt.details {
        AttemptDetails::MultiFactor {
            factors,
            failed_factors,
        } => {
            assert_eq!(factors.len(), 2);
            assert_eq!(failed_factors, &vec![FactorType::Behavioral]);
        }
        other => panic!("unexpected details {:?}", other),
    }
}

#[tokio::test]
async fn test_all_factors_failing_stores_nothing() {
    let engine = Harness::new(SimulatedDevice::new())
        .without_camera()
        .open()
        .await;
    let mut failed = engine.subscribe_failed();

    let result = engine.start_verification(VerificationOptions::default()).await;

    assert!(matches!(result, Err(EngineError::AllFactorsFailed(_))));
    assert!(engine.verification_history().await.is_empty());
    assert!(engine.verification_proof().await.is_none());
    assert_eq!(
        failed.try_recv().unwrap().method,
        VerificationMethod::MultiFactor
    );
}

// =========================================================================
// Single methods
// =========================================================================

#[tokio::test]
async fn test_minor_document_from_file() {
    let dir = temp_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("scan.bin");
    std::fs::write(&path, vec![128u8; 256]).unwrap();

    let engine = Harness::new(flagged_device())
        .scorer(FixedScorer::minor_document())
        .open()
        .await;
    let options = method(VerificationMethod::Document).with_document(DocumentOptions::file(
        DocumentType::Passport,
        FileHandle::new(path.to_string_lossy().into_owned()),
    ));

    let attempt = engine.start_verification(options).await.unwrap();

    assert!(!attempt.verified);
    assert!(attempt.confidence <= 0.5 + 1e-9);
    assert!(attempt.proof.is_none());
    match &attempt.details {
        AttemptDetails::Document {
            is_valid,
            age,
            validation_errors,
            ..
        } => {
            assert!(!is_valid);
            assert_eq!(*age, Some(16));
            assert!(validation_errors.iter().any(|e| e == "under 18"));
        }
        other => panic!("unexpected details {:?}", other),
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_document_with_two_sources_is_rejected() {
    let engine = Harness::new(flagged_device()).open().await;
    let options = method(VerificationMethod::Document).with_document(DocumentOptions {
        document_type: DocumentType::NationalId,
        use_camera: true,
        file: Some(FileHandle::new("id.png")),
    });

    let result = engine.start_verification(options).await;

    assert!(matches!(
        result,
        Err(EngineError::VerificationFailed {
            method: VerificationMethod::Document,
            source: FactorError::InvalidCaptureSource(_),
        })
    ));
}

#[tokio::test]
async fn test_biometric_under_minimum_age_is_unverified() {
    let config = EngineConfig {
        minimum_age: 30,
        ..Default::default()
    };
    let engine = Harness::new(flagged_device()).config(config).open().await;

    let attempt = engine
        .start_verification(method(VerificationMethod::Biometric))
        .await
        .unwrap();

    assert!(!attempt.verified);
    assert_eq!(attempt.level, VerificationLevel::None);
    assert!(engine.verification_proof().await.is_none());
}

#[test]
fn test_unknown_method_is_rejected_before_running() {
    assert!(matches!(
        VerificationOptions::parse("palm_print"),
        Err(EngineError::UnknownMethod(_))
    ));
}

// =========================================================================
// History and proofs
// =========================================================================

#[tokio::test]
async fn test_eleven_successes_keep_latest_ten() {
    let engine = Harness::new(flagged_device()).open().await;
    let mut ids = Vec::new();
    for _ in 0..11 {
        let attempt = engine
            .start_verification(method(VerificationMethod::DeviceSettings))
            .await
            .unwrap();
        ids.push(attempt.id);
    }

    let history = engine.verification_history().await;
    assert_eq!(history.len(), 10);
    assert!(history.iter().all(|a| a.id != ids[0]));
    assert_eq!(history[0].id, ids[1]);
    assert_eq!(engine.recent_history(1).await[0].id, ids[10]);
    assert_eq!(engine.verification_stats().await.total, 10);
}

#[tokio::test]
async fn test_proof_tracks_latest_attempt() {
    let device = flagged_device();
    let engine = Harness::new(device)
        .scorer(FixedScorer::minor_document())
        .open()
        .await;

    engine
        .start_verification(method(VerificationMethod::DeviceSettings))
        .await
        .unwrap();
    let proof = engine.verification_proof().await.expect("verified attempt");
    assert!(matches!(proof.proof, ProofToken::Digested(ref t) if t.len() == 16));

    engine
        .start_verification(method(VerificationMethod::Document))
        .await
        .unwrap();
    assert!(engine.verification_proof().await.is_none());

    engine
        .start_verification(method(VerificationMethod::DeviceSettings))
        .await
        .unwrap();
    assert!(engine.verification_proof().await.is_some());
}

#[tokio::test]
async fn test_proof_has_no_personal_data() {
    let engine = Harness::new(flagged_device()).open().await;
    engine
        .start_verification(method(VerificationMethod::Document))
        .await
        .unwrap();

    let proof = engine.verification_proof().await.unwrap();
    let json = serde_json::to_string(&proof).unwrap();
    assert!(!json.contains("Jordan"));
    assert!(!json.contains("X0000001"));
    assert!(!json.contains("age\":"));

    let history = serde_json::to_string(&engine.verification_history().await).unwrap();
    assert!(!history.contains("Jordan"));
    assert!(!history.contains("X0000001"));
}

#[tokio::test]
async fn test_simulated_runs_respect_level_rules() {
    let device = flagged_device().with_usage(SimulatedDevice::established_usage());
    let engine = Harness::new(device)
        .scorer(SimulatedScorer::with_seed(11))
        .open()
        .await;

    for _ in 0..20 {
        let attempt = engine
            .start_verification(VerificationOptions::default())
            .await
            .unwrap();
        assert!((0.0..=1.0).contains(&attempt.confidence));
        let n = attempt.succeeded_factors();
        match attempt.level {
            VerificationLevel::High => assert!(attempt.confidence >= 0.85 && n >= 3),
            VerificationLevel::Standard => assert!(attempt.confidence >= 0.75 && n >= 2),
            VerificationLevel::Basic => assert!(attempt.confidence >= 0.60 && n >= 1),
            VerificationLevel::None => assert!(!attempt.verified),
        }
        assert_eq!(attempt.proof.is_some(), attempt.verified);
    }
}
