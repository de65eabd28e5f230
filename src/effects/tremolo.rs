//! Amplitude tremolo driven by the shared modulation LFO

use crate::utils::SmoothedParam;

/// Gain for one sample: `1 - depth * 0.5 * (1 + sin(phase))`
#[inline]
pub fn tremolo_gain(depth: f32, phase: f32) -> f32 {
    1.0 - depth * 0.5 * (1.0 + phase.sin())
}

/// Multiply every channel by the tremolo gain
///
/// `phases` holds the LFO phase (radians) for each frame of the block.
/// `depth` is already scaled by build-up and is ticked once per frame; the
/// signal is left untouched only while it rests at exactly zero.
pub fn apply_tremolo(channels: &mut [&mut [f32]], phases: &[f32], depth: &mut SmoothedParam) {
    if depth.is_settled() && depth.get() == 0.0 {
        return;
    }
    for (i, &phase) in phases.iter().enumerate() {
        let gain = tremolo_gain(depth.tick().min(1.0), phase);
        for channel in channels.iter_mut().take(2) {
            if let Some(sample) = channel.get_mut(i) {
                *sample *= gain;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn depth_at(value: f32) -> SmoothedParam {
        SmoothedParam::new(value, 0.0, 1.0, 44100.0, 20.0)
    }

    #[test]
    fn test_gain_range() {
        assert_eq!(tremolo_gain(1.0, -FRAC_PI_2), 1.0);
        assert!(tremolo_gain(1.0, FRAC_PI_2).abs() < 1e-6);
        assert!((tremolo_gain(0.5, 0.0) - 0.75).abs() < 1e-6);
        assert!((tremolo_gain(0.5, PI) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_zero_depth_is_bypassed() {
        let input = vec![0.5f32; 64];
        let mut block = input.clone();
        let phases = vec![FRAC_PI_2; 64];
        apply_tremolo(&mut [&mut block[..]], &phases, &mut depth_at(0.0));
        assert_eq!(block, input);
    }

    #[test]
    fn test_shallow_depth_still_applies() {
        let mut block = vec![1.0f32; 8];
        let phases = vec![FRAC_PI_2; 8];
        apply_tremolo(&mut [&mut block[..]], &phases, &mut depth_at(0.005));
        assert!(block.iter().all(|s| (*s - 0.995).abs() < 1e-6));
    }

    #[test]
    fn test_depth_change_ramps() {
        let mut depth = depth_at(0.0);
        depth.set_target(1.0);
        let mut block = vec![1.0f32; 4410];
        let phases = vec![FRAC_PI_2; 4410];
        apply_tremolo(&mut [&mut block[..]], &phases, &mut depth);
        // Full depth at this phase means silence, reached gradually
        assert!(block[0] > 0.99);
        assert!(block[4409] < 0.01);
        assert!(block.windows(2).all(|w| (w[1] - w[0]).abs() < 0.01));
    }

    #[test]
    fn test_both_channels_share_gain() {
        let mut left = vec![1.0f32; 4];
        let mut right = vec![0.5f32; 4];
        let phases = [0.0, FRAC_PI_2, PI, -FRAC_PI_2];
        apply_tremolo(&mut [&mut left[..], &mut right[..]], &phases, &mut depth_at(0.8));
        for i in 0..4 {
            assert!((left[i] * 0.5 - right[i]).abs() < 1e-6);
        }
        assert!(left[1] < left[3]);
    }
}
