// Integration tests for parameter persistence and snapshots

use buildup::params::{
    DelayDivision, FilterType, MacroMode, NoiseType, ParamError, ParamId, ParamSnapshot, ParameterSet, PARAM_COUNT,
};
use std::sync::Arc;
use std::thread;

#[test]
fn test_saved_state_restores_in_any_order() {
    let source = ParameterSet::new();
    source.set(ParamId::BuildUp, 64.0);
    source.set(ParamId::FilterType, FilterType::DualSweep.index() as f32);
    source.set(ParamId::NoiseType, NoiseType::Vinyl.index() as f32);
    source.set(ParamId::DelayTime, DelayDivision::Half.index() as f32);
    source.set(ParamId::RiserRelease, 2.5);

    let mut saved = source.save_state();
    assert_eq!(saved.len(), PARAM_COUNT);
    saved.reverse();

    let restored = ParameterSet::new();
    let errors = restored.load_state(saved);
    assert!(errors.is_empty());
    assert_eq!(restored.snapshot(), source.snapshot());
}

#[test]
fn test_unknown_keys_are_reported_and_skipped() {
    let params = ParameterSet::new();
    let errors = params.load_state(vec![
        ("reverbMix", 10.0),
        ("legacyKnob", 3.0),
        ("buildup", 40.0),
    ]);
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], ParamError::UnknownParameter(key) if key == "legacyKnob"));
    assert_eq!(params.get(ParamId::ReverbMix), 10.0);
    assert_eq!(params.get(ParamId::BuildUp), 40.0);
}

#[test]
fn test_loaded_values_are_clamped() {
    let params = ParameterSet::new();
    let errors = params.load_state(vec![
        ("tremoloRate".to_string(), 100.0),
        ("macroMode".to_string(), -4.0),
        ("stereoWidth".to_string(), f32::INFINITY),
    ]);
    assert!(errors.is_empty());
    assert_eq!(params.get(ParamId::TremoloRate), 20.0);
    assert_eq!(params.snapshot().macro_mode, MacroMode::Off);
    assert_eq!(params.get(ParamId::StereoWidth), 100.0);
}

#[test]
fn test_snapshot_json_uses_camel_case_keys() {
    let params = ParameterSet::new();
    params.set(ParamId::DelayFeedback, 45.0);
    let json = params.snapshot().to_json().expect("snapshot serializes");
    assert!(json.contains("\"delayFeedback\": 45.0"));
    assert!(json.contains("\"autoGain\": true"));

    let parsed = ParamSnapshot::from_json(&json).expect("snapshot parses");
    let other = ParameterSet::new();
    other.apply_snapshot(&parsed);
    assert_eq!(other.get(ParamId::DelayFeedback), 45.0);
}

#[test]
fn test_writes_from_another_thread_are_seen() {
    let params = Arc::new(ParameterSet::new());
    let writer = Arc::clone(&params);
    let version = params.version();

    thread::spawn(move || {
        for i in 0..=100 {
            writer.set(ParamId::BuildUp, i as f32);
        }
    })
    .join()
    .expect("writer thread finished");

    assert_eq!(params.get(ParamId::BuildUp), 100.0);
    assert_eq!(params.version(), version + 101);
    assert!(params.take_changed().contains(ParamId::BuildUp));
}
