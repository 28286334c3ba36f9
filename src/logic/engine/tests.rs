use chrono::{Duration, TimeZone, Utc};

use super::types::{DecisionStage, EngineState, Verdict};
use super::verification::{reward_increment, tuning_drift, VerificationEngine};
use crate::logic::config::VerifierConfig;
use crate::logic::features::Sample;
use crate::logic::model::{DetectorError, ForestConfig, SnapshotError};
use crate::logic::physics::PhysicsClass;

fn engine() -> VerificationEngine {
    VerificationEngine::new(VerifierConfig::default()).unwrap()
}

fn at(i: i64, voltage: f64, current: f64) -> Sample {
    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Sample::new(voltage, current, start + Duration::seconds(i))
}

/// Normal readings around 0.8 V / 20 mA
fn normal(i: i64) -> Sample {
    let t = i as f64;
    at(i, 0.8 + 0.03 * t.sin(), 0.02 + 0.002 * (t * 0.7).cos())
}

fn calibrated() -> VerificationEngine {
    let mut e = engine();
    for i in 0..20 {
        e.ingest(normal(i));
    }
    e
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = VerifierConfig::default();
    config.window_capacity = 5;
    assert!(VerificationEngine::new(config).is_err());
}

#[test]
fn test_fraud_ceiling_always_anomalous() {
    let mut e = engine();
    assert_eq!(e.ingest(at(0, 5.0, 50.0)), Verdict::Anomalous);

    let mut e = calibrated();
    let a = e.assess(at(100, 2.0001, 0.0));
    assert_eq!(a.verdict, Verdict::Anomalous);
    assert_eq!(a.stage, DecisionStage::PhysicsRule);
    assert_eq!(a.physics, PhysicsClass::DefinitelyFraud);
    assert_eq!(a.reward_increment, 0.0);
}

#[test]
fn test_genuine_band_always_authentic() {
    // Huge current, before calibration
    let mut e = engine();
    let a = e.assess(at(0, 0.8, 50.0));
    assert_eq!(a.verdict, Verdict::Authentic);
    assert_eq!(a.stage, DecisionStage::PhysicsRule);
    assert!(a.detector.is_none());

    let mut e = calibrated();
    assert_eq!(e.ingest(at(100, 1.4, 1000.0)), Verdict::Authentic);
}

#[test]
fn test_gray_zone_uncertain_while_calibrating() {
    let mut e = engine();
    let a = e.assess(at(0, 1.8, 0.02));
    assert_eq!(a.verdict, Verdict::Uncertain);
    assert_eq!(a.stage, DecisionStage::Calibrating);
    assert_eq!(a.reward_increment, 0.0);
    assert_eq!(e.state(), EngineState::Calibrating);

    // Band edges are not inside the band
    assert_eq!(e.ingest(at(1, 1.5, 0.02)), Verdict::Uncertain);
    assert_eq!(e.ingest(at(2, 0.0, 0.02)), Verdict::Uncertain);
}

#[test]
fn test_gray_zone_never_uncertain_when_ready() {
    let mut e = calibrated();
    assert_eq!(e.state(), EngineState::Ready);

    for i in 0..30 {
        let v = 1.5 + 0.5 * (i as f64) / 30.0;
        let a = e.assess(at(100 + i, v, 0.02));
        assert_ne!(a.verdict, Verdict::Uncertain);
        assert_eq!(a.stage, DecisionStage::Detector);
        assert!(a.detector.is_some());
    }
}

#[test]
fn test_gray_zone_authentic_via_detector_earns_reward() {
    // Calibrate on a producer whose normal output sits in the gray zone
    let mut e = engine();
    for i in 0..20 {
        let t = i as f64;
        e.ingest(at(i, 1.7 + 0.03 * t.sin(), 0.02 + 0.002 * (t * 0.7).cos()));
    }
    assert_eq!(e.state(), EngineState::Ready);

    let a = e.assess(at(100, 1.7, 0.02));
    assert_eq!(a.physics, PhysicsClass::Inconclusive);
    assert_eq!(a.stage, DecisionStage::Detector);
    assert_eq!(a.verdict, Verdict::Authentic);
    assert!((a.reward_increment - 1.7 * 0.02 * 0.0001).abs() < 1e-15);
}

#[test]
fn test_fraud_reading_excluded_from_calibration() {
    let mut e = engine();
    for i in 0..19 {
        e.ingest(normal(i));
    }
    assert_eq!(e.ingest(at(19, 1e200, 1e200)), Verdict::Anomalous);
    assert_eq!(e.state(), EngineState::Ready);
    assert_eq!(e.detector().training_samples(), 19);

    let a = e.assess(at(100, 1.8, 0.02));
    assert_eq!(a.verdict, Verdict::Anomalous);
    assert_eq!(a.stage, DecisionStage::Detector);
}

#[test]
fn test_calibration_waits_for_plausible_rows() {
    let mut e = engine();
    for i in 0..25 {
        assert_eq!(e.ingest(at(i, 3.0, 0.02)), Verdict::Anomalous);
    }
    assert_eq!(e.state(), EngineState::Calibrating);

    e.ingest(normal(25));
    e.ingest(normal(26));
    assert_eq!(e.state(), EngineState::Ready);
    assert_eq!(e.detector().training_samples(), 2);
}

#[test]
fn test_calibration_transition_once() {
    let mut e = engine();
    for i in 0..19 {
        assert!(!e.assess(normal(i)).calibrated_now);
    }
    assert_eq!(e.state(), EngineState::Calibrating);

    assert!(e.assess(normal(19)).calibrated_now);
    assert_eq!(e.state(), EngineState::Ready);

    for i in 20..80 {
        assert!(!e.assess(normal(i)).calibrated_now);
    }
    assert_eq!(e.detector().trainings(), 1);
    assert_eq!(e.detector().training_samples(), 20);
}

#[test]
fn test_scenario() {
    let mut e = engine();

    assert_eq!(e.ingest(at(0, 5.0, 50.0)), Verdict::Anomalous);
    assert_eq!(e.ingest(at(1, 0.8, 50.0)), Verdict::Authentic);
    assert_eq!(e.ingest(at(2, 1.8, 0.02)), Verdict::Uncertain);

    // 3 samples already in the window; 17 more normal ones calibrate
    for i in 3..20 {
        e.ingest(normal(i));
    }
    assert_eq!(e.state(), EngineState::Ready);

    let mut fresh = calibrated();
    assert_eq!(fresh.ingest(at(100, 1.8, 0.02)), Verdict::Anomalous);
}

#[test]
fn test_deterministic_across_engines() {
    let inputs: Vec<Sample> = (0..20)
        .map(normal)
        .chain((0..40).map(|i| at(100 + i, 1.5 + 0.01 * i as f64, 0.02 + 0.0005 * i as f64)))
        .collect();

    let mut a = engine();
    let mut b = engine();
    for s in &inputs {
        let x = a.assess(*s);
        let y = b.assess(*s);
        assert_eq!(x.verdict, y.verdict);
        assert_eq!(x.detector, y.detector);
    }
}

#[test]
fn test_reward_proportional_to_power() {
    let mut e = engine();
    let a = e.assess(at(0, 0.8, 0.02));
    assert!((a.reward_increment - 0.016 * 0.0001).abs() < 1e-15);

    let b = e.assess(at(1, 0.8, 0.04));
    assert!((b.reward_increment - 2.0 * a.reward_increment).abs() < 1e-15);

    // Zero power earns nothing
    let c = e.assess(at(2, 0.8, 0.0));
    assert_eq!(c.verdict, Verdict::Authentic);
    assert_eq!(c.reward_increment, 0.0);

    let status = e.status();
    assert!((status.total_reward_issued - 3.0 * a.reward_increment).abs() < 1e-15);
}

#[test]
fn test_reward_respects_idle_floor() {
    assert_eq!(reward_increment(0.01, 0.01, 0.0001), 0.0);
    assert!(reward_increment(0.02, 0.01, 0.0001) > 0.0);
    assert_eq!(reward_increment(f64::NAN, 0.0, 0.0001), 0.0);

    let mut config = VerifierConfig::default();
    config.idle_power_floor = 0.1;
    let mut e = VerificationEngine::new(config).unwrap();
    assert_eq!(e.assess(at(0, 0.8, 0.02)).reward_increment, 0.0);
    assert!(e.assess(at(1, 0.8, 1.0)).reward_increment > 0.0);
}

#[test]
fn test_window_eviction_keeps_capacity() {
    let mut e = engine();
    let capacity = e.window().capacity();
    for i in 0..(capacity as i64 + 5) {
        e.ingest(at(i, 0.5, 0.001 * i as f64));
    }

    assert_eq!(e.window().len(), capacity);
    let first = e.window().iter().next().unwrap();
    assert_eq!(first.timestamp(), at(5, 0.0, 0.0).timestamp());
    let stamps: Vec<_> = e.window().iter().map(|s| s.timestamp()).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_retrain_requires_full_window() {
    let mut e = engine();
    for i in 0..5 {
        e.ingest(normal(i));
    }
    assert_eq!(
        e.retrain().unwrap_err(),
        DetectorError::InsufficientData { have: 5, need: 20 }
    );
    assert_eq!(e.state(), EngineState::Calibrating);

    let mut e = calibrated();
    let report = e.retrain().unwrap();
    assert_eq!(report.samples, 20);
    assert_eq!(e.detector().trainings(), 2);
}

#[test]
fn test_snapshot_restore_skips_calibration() {
    let source = calibrated();
    let snapshot = source.snapshot().unwrap();

    let mut restored = engine();
    restored.restore(snapshot).unwrap();
    assert_eq!(restored.state(), EngineState::Ready);
    assert!(restored.window().is_empty());

    let mut reference = calibrated();
    let gray = at(200, 1.8, 0.02);
    assert_eq!(restored.ingest(gray), reference.ingest(gray));
}

#[test]
fn test_tuning_drift_names_changed_settings() {
    let config = VerifierConfig::default();
    let same = ForestConfig {
        n_estimators: config.detector.n_estimators,
        max_samples: config.detector.max_samples,
        contamination: config.contamination_rate,
        seed: config.detector.seed,
    };
    assert!(tuning_drift(&config, &same).is_empty());

    let other = ForestConfig {
        contamination: 0.2,
        seed: config.detector.seed + 1,
        ..same
    };
    assert_eq!(tuning_drift(&config, &other), vec!["contamination", "seed"]);
}

#[test]
fn test_restore_keeps_snapshot_tuning() {
    let snapshot = calibrated().snapshot().unwrap();

    let mut config = VerifierConfig::default();
    config.contamination_rate = 0.2;
    let mut restored = VerificationEngine::new(config).unwrap();
    restored.restore(snapshot).unwrap();
    assert_eq!(restored.state(), EngineState::Ready);

    let mut reference = calibrated();
    let gray = at(200, 1.8, 0.02);
    assert_eq!(restored.ingest(gray), reference.ingest(gray));
}

#[test]
fn test_snapshot_untrained_fails() {
    assert!(matches!(engine().snapshot(), Err(SnapshotError::NotTrained)));
}

#[test]
fn test_status_counts_verdicts() {
    let mut e = engine();
    e.ingest(at(0, 5.0, 1.0));
    e.ingest(at(1, 0.8, 0.02));
    e.ingest(at(2, 1.8, 0.02));

    let status = e.status();
    assert_eq!(status.verdicts.anomalous, 1);
    assert_eq!(status.verdicts.authentic, 1);
    assert_eq!(status.verdicts.uncertain, 1);
    assert_eq!(status.verdicts.total(), 3);
    assert_eq!(status.window.current_size, 3);
    assert!(!status.window.is_ready);
    assert!(!status.model.trained);
    assert_eq!(status.model.engine, "isolation_forest");
}
