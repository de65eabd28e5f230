// Integration tests for the riser frequency sweep

use buildup::gen::riser::SINE_TOP_HZ;
use buildup::gen::{Riser, RiserSettings};
use buildup::params::RiserType;

const SAMPLE_RATE: f32 = 44100.0;
const BLOCK: usize = 64;

fn settings(riser_type: RiserType, build_up: f32) -> RiserSettings {
    RiserSettings {
        riser_type,
        build_up,
        amount: 1.0,
        release_s: 0.1,
    }
}

/// Sweep build-up 0 -> 1 over `seconds`, returning the base frequency after each block
fn sweep(riser: &mut Riser, riser_type: RiserType, seconds: f32) -> Vec<f32> {
    let blocks = (seconds * SAMPLE_RATE) as usize / BLOCK;
    let mut left = vec![0.0f32; BLOCK];
    let mut right = vec![0.0f32; BLOCK];
    let mut freqs = Vec::with_capacity(blocks);
    for b in 0..=blocks {
        let bu = b as f32 / blocks as f32;
        riser.configure(&settings(riser_type, bu));
        left.fill(0.0);
        right.fill(0.0);
        riser.process(&mut [&mut left[..], &mut right[..]]);
        freqs.push(riser.base_frequency());
    }
    freqs
}

#[test]
fn test_sine_sweep_is_monotonic_and_reaches_top() {
    let mut riser = Riser::new(SAMPLE_RATE, 1);
    let freqs = sweep(&mut riser, RiserType::Sine, 4.0);

    for pair in freqs.windows(2) {
        assert!(pair[1] >= pair[0], "frequency fell from {} to {}", pair[0], pair[1]);
    }

    // Hold at the top and let the glide settle
    let mut block = vec![0.0f32; BLOCK];
    for _ in 0..(SAMPLE_RATE as usize / BLOCK) {
        riser.configure(&settings(RiserType::Sine, 1.0));
        riser.process(&mut [&mut block[..]]);
    }
    let top = riser.base_frequency();
    assert!((top - SINE_TOP_HZ).abs() < SINE_TOP_HZ * 0.01, "settled at {}", top);
    // Vibrato tops out at 7 % around the base
    assert!(top * 1.07 <= SINE_TOP_HZ * 1.08);
}

#[test]
fn test_saw_and_square_scale_the_sine_sweep() {
    let at = |t, bu| settings(t, bu).target_frequency();
    let base = at(RiserType::Sine, 0.0);
    let span = SINE_TOP_HZ - base;

    // Same starting point for all three
    assert_eq!(at(RiserType::Saw, 0.0), base);
    assert_eq!(at(RiserType::Square, 0.0), base);

    assert!((at(RiserType::Saw, 1.0) - (base + span * 1.2)).abs() < 1e-2);
    assert!((at(RiserType::Square, 1.0) - (base + span * 0.8)).abs() < 1e-2);
}

#[test]
fn test_sub_drop_falls_as_build_up_rises() {
    let mut riser = Riser::new(SAMPLE_RATE, 2);
    let freqs = sweep(&mut riser, RiserType::SubDrop, 2.0);
    let first = settings(RiserType::SubDrop, 0.0).target_frequency();
    let last = settings(RiserType::SubDrop, 1.0).target_frequency();
    assert!(last < first);
    assert!(freqs.last().copied().unwrap_or(first) < first);
}

#[test]
fn test_every_voice_stays_finite_through_sweep() {
    for riser_type in [
        RiserType::Sine,
        RiserType::Saw,
        RiserType::Square,
        RiserType::NoiseSweep,
        RiserType::SubDrop,
    ] {
        let mut riser = Riser::new(SAMPLE_RATE, 3);
        let blocks = SAMPLE_RATE as usize / BLOCK;
        let mut peak = 0.0f32;
        for b in 0..blocks {
            riser.configure(&settings(riser_type, b as f32 / blocks as f32));
            let mut block = vec![0.0f32; BLOCK];
            riser.process(&mut [&mut block[..]]);
            assert!(block.iter().all(|s| s.is_finite()), "{:?} produced non-finite output", riser_type);
            peak = block.iter().fold(peak, |m, s| m.max(s.abs()));
        }
        assert!(peak > 0.0, "{:?} stayed silent", riser_type);
        assert!(peak < 2.0, "{:?} peaked at {}", riser_type, peak);
    }
}
