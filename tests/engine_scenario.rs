// Integration tests for whole-engine processing scenarios

use buildup::engine::BuildUpEngine;
use buildup::params::{ParamId, ParameterSet};
use buildup::presets;
use std::f32::consts::TAU;
use std::sync::Arc;

const SAMPLE_RATE: f32 = 44100.0;
const BLOCK: usize = 512;

fn sine(freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (TAU * freq * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

/// Run `input` through the engine block by block, returning (left, right)
fn render_stereo(engine: &mut BuildUpEngine, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mut left = input.to_vec();
    let mut right = input.to_vec();
    for (l, r) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
        engine.process(&mut [l, r], Some(120.0));
    }
    (left, right)
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn test_one_second_of_sine_stays_bounded() {
    let params = Arc::new(ParameterSet::new());
    params.set(ParamId::BuildUp, 50.0);
    params.set(ParamId::ReverbMix, 50.0);
    let mut engine = BuildUpEngine::new(Arc::clone(&params));

    let input = sine(440.0, SAMPLE_RATE as usize);
    let (left, right) = render_stereo(&mut engine, &input);

    assert!(left.iter().chain(right.iter()).all(|s| s.is_finite()));
    assert!(peak(&left) < 4.0 && peak(&right) < 4.0);
    assert!(peak(&left) > 0.01, "signal vanished");
    assert!((engine.build_up() - 0.5).abs() < 1e-3);
    assert!(!engine.is_bypassed());
}

#[test]
fn test_every_preset_renders_in_mono_and_stereo() {
    for index in 0..presets::count() {
        let params = Arc::new(ParameterSet::new());
        presets::select(&params, index).expect("preset exists");

        let mut stereo = BuildUpEngine::new(Arc::clone(&params));
        let input = sine(220.0, SAMPLE_RATE as usize / 2);
        let (left, right) = render_stereo(&mut stereo, &input);
        assert!(
            left.iter().chain(right.iter()).all(|s| s.is_finite()),
            "preset {} produced non-finite stereo output",
            index
        );

        let mut mono_engine = BuildUpEngine::new(Arc::clone(&params));
        let mut mono = input.clone();
        for block in mono.chunks_mut(BLOCK) {
            mono_engine.process(&mut [block], Some(120.0));
        }
        assert!(
            mono.iter().all(|s| s.is_finite()),
            "preset {} produced non-finite mono output",
            index
        );
        assert!(peak(&mono) < 8.0);
    }
}

#[test]
fn test_everything_maxed_stays_finite() {
    let params = Arc::new(ParameterSet::new());
    for id in ParamId::ALL {
        params.set(id, id.range().1);
    }
    let mut engine = BuildUpEngine::new(Arc::clone(&params));
    engine.reverb_mut().set_freeze_mode(1.0);

    let input = sine(110.0, 2 * SAMPLE_RATE as usize);
    let (left, right) = render_stereo(&mut engine, &input);
    assert!(left.iter().chain(right.iter()).all(|s| s.is_finite()));
}

#[test]
fn test_auto_gain_pulls_down_under_heavy_load() {
    let params = Arc::new(ParameterSet::new());
    params.set(ParamId::BuildUp, 100.0);
    params.set(ParamId::FilterIntensity, 100.0);
    params.set(ParamId::ReverbMix, 100.0);
    params.set(ParamId::NoiseAmount, 100.0);
    params.set(ParamId::DelayMix, 100.0);
    let mut engine = BuildUpEngine::new(Arc::clone(&params));

    let input = sine(330.0, 4 * SAMPLE_RATE as usize);
    render_stereo(&mut engine, &input);
    let reduced = engine.auto_gain();
    assert!(reduced < 0.99, "auto gain stayed at {}", reduced);
    assert!(reduced > 0.5);

    // Turning auto gain off eases all the way back to unity
    params.set(ParamId::AutoGain, 0.0);
    render_stereo(&mut engine, &input);
    assert!(engine.auto_gain() > reduced);
    render_stereo(&mut engine, &input);
    render_stereo(&mut engine, &input);
    assert_eq!(engine.auto_gain(), 1.0);
}

#[test]
fn test_interleaved_matches_planar() {
    let params = Arc::new(ParameterSet::new());
    presets::select(&params, 5).expect("preset exists");
    params.set(ParamId::StereoWidth, 150.0);
    params.set(ParamId::SmartPan, 60.0);

    let mut planar_engine = BuildUpEngine::new(Arc::clone(&params));
    let mut interleaved_engine = BuildUpEngine::new(Arc::clone(&params));

    let input = sine(523.0, BLOCK * 40);
    let (left, right) = render_stereo(&mut planar_engine, &input);

    let mut interleaved: Vec<f32> = input.iter().flat_map(|&s| [s, s]).collect();
    for block in interleaved.chunks_mut(BLOCK * 2) {
        interleaved_engine.process_interleaved(block, 2, Some(120.0));
    }

    for (i, frame) in interleaved.chunks_exact(2).enumerate() {
        assert_eq!(frame[0], left[i], "left differs at frame {}", i);
        assert_eq!(frame[1], right[i], "right differs at frame {}", i);
    }
}

#[test]
fn test_prepare_at_new_rate_keeps_working() {
    let params = Arc::new(ParameterSet::new());
    params.set(ParamId::BuildUp, 70.0);
    params.set(ParamId::DelayMix, 50.0);
    let mut engine = BuildUpEngine::new(Arc::clone(&params));
    engine.prepare(96000.0, 256);
    assert_eq!(engine.sample_rate(), 96000.0);
    assert_eq!(engine.max_block_size(), 256);

    let mut block = sine(440.0, 1024);
    engine.process(&mut [&mut block[..]], Some(140.0));
    assert!(block.iter().all(|s| s.is_finite()));
    assert!(engine.delay().capacity() >= 2 * 96000);

    engine.prepare(-1.0, 0);
    assert_eq!(engine.sample_rate(), 44100.0);
    assert_eq!(engine.max_block_size(), 1);
}
