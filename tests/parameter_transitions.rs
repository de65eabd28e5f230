// Integration tests for click-free parameter changes between blocks

use buildup::engine::BuildUpEngine;
use buildup::params::{ParamId, ParameterSet};
use std::sync::Arc;

const BLOCK: usize = 512;
/// Shorter than a quarter note at 120 BPM, so no new echo arrives inside it
const WINDOW_BLOCKS: usize = 8;

fn quiet_engine(params: &Arc<ParameterSet>) -> BuildUpEngine {
    params.set(ParamId::BuildUp, 100.0);
    for id in [
        ParamId::FilterIntensity,
        ParamId::ReverbMix,
        ParamId::NoiseAmount,
        ParamId::RiserAmount,
        ParamId::TremoloDepth,
        ParamId::SmartPan,
        ParamId::DelayFeedback,
        ParamId::AutoGain,
    ] {
        params.set(id, 0.0);
    }
    params.set(ParamId::StereoWidth, 100.0);
    params.set(ParamId::DelayMix, 100.0);
    BuildUpEngine::new(Arc::clone(params))
}

/// Process `blocks` blocks of a constant, unequal stereo signal
fn render(engine: &mut BuildUpEngine, blocks: usize, left: &mut Vec<f32>, right: &mut Vec<f32>) {
    for _ in 0..blocks {
        let mut l = vec![0.5f32; BLOCK];
        let mut r = vec![-0.25f32; BLOCK];
        engine.process(&mut [&mut l[..], &mut r[..]], Some(120.0));
        left.extend_from_slice(&l);
        right.extend_from_slice(&r);
    }
}

fn largest_step(samples: &[f32]) -> f32 {
    samples.windows(2).map(|w| (w[1] - w[0]).abs()).fold(0.0, f32::max)
}

#[test]
fn test_stepped_controls_do_not_click() {
    let params = Arc::new(ParameterSet::new());
    let mut engine = quiet_engine(&params);
    let (mut left, mut right) = (Vec::new(), Vec::new());

    // Past the first echo of the signal onset
    render(&mut engine, 20, &mut left, &mut right);
    let settled = left.len() - 1;

    params.set(ParamId::DelayMix, 0.0);
    params.set(ParamId::StereoWidth, 0.0);
    params.set(ParamId::TremoloDepth, 100.0);
    params.set(ParamId::SmartPan, 100.0);
    render(&mut engine, WINDOW_BLOCKS, &mut left, &mut right);

    assert!(largest_step(&left[settled..]) < 0.01, "left step {}", largest_step(&left[settled..]));
    assert!(largest_step(&right[settled..]) < 0.01, "right step {}", largest_step(&right[settled..]));

    let changed = left.len() - 1;
    params.set(ParamId::DelayMix, 100.0);
    params.set(ParamId::StereoWidth, 200.0);
    params.set(ParamId::TremoloDepth, 0.0);
    params.set(ParamId::SmartPan, 0.0);
    render(&mut engine, WINDOW_BLOCKS, &mut left, &mut right);

    assert!(largest_step(&left[changed..]) < 0.01, "left step {}", largest_step(&left[changed..]));
    assert!(largest_step(&right[changed..]) < 0.01, "right step {}", largest_step(&right[changed..]));
}

#[test]
fn test_controls_still_reach_their_targets() {
    let params = Arc::new(ParameterSet::new());
    let mut engine = quiet_engine(&params);
    let (mut left, mut right) = (Vec::new(), Vec::new());
    render(&mut engine, 20, &mut left, &mut right);

    // Mono width and no delay: both sides land on the mid signal
    params.set(ParamId::DelayMix, 0.0);
    params.set(ParamId::StereoWidth, 0.0);
    render(&mut engine, 80, &mut left, &mut right);

    let (l, r) = (left[left.len() - 1], right[right.len() - 1]);
    assert!((l - 0.125).abs() < 1e-4, "left {}", l);
    assert!((r - 0.125).abs() < 1e-4, "right {}", r);
    assert_eq!(engine.delay().mix(), 0.0);
}
