//! Gain staging: the input-driven noise gate and auto-gain compensation

use crate::envelope::{rms, EnvelopeFollower};
use crate::utils::SmoothedParam;

const GATE_ATTACK_MS: f32 = 1.0;
const GATE_RELEASE_MS: f32 = 20.0;
const GATE_SMOOTH_MS: f32 = 5.0;
const GATE_MIN_THRESHOLD: f32 = 0.0001;
const GATE_MAX_THRESHOLD: f32 = 0.1;

/// Auto-gain time constant
const AUTO_GAIN_SMOOTH_MS: f32 = 3000.0;
const AUTO_GAIN_DEPTH: f32 = 0.3;

/// Gate threshold for a 0-1 gate control
pub fn gate_threshold(amount: f32) -> f32 {
    GATE_MIN_THRESHOLD + amount.clamp(0.0, 1.0) * (GATE_MAX_THRESHOLD - GATE_MIN_THRESHOLD)
}

/// Opens the vocoder while the input carries signal above the threshold
///
/// Runs at block rate: one RMS reading per block feeds the follower, and the
/// 0/1 gate decision is smoothed so the vocoder never switches hard.
pub struct NoiseGate {
    follower: EnvelopeFollower,
    gate: SmoothedParam,
    sample_rate: f32,
}

impl NoiseGate {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follower: EnvelopeFollower::new(sample_rate, GATE_ATTACK_MS, GATE_RELEASE_MS),
            gate: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, GATE_SMOOTH_MS),
            sample_rate,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.follower.set_sample_rate(sample_rate);
        self.gate.set_smooth_time(sample_rate, GATE_SMOOTH_MS);
    }

    pub fn reset(&mut self) {
        self.follower.reset();
        self.gate.set_immediate(0.0);
    }

    /// Update from one block of input and return the smoothed gate (0-1)
    pub fn process(&mut self, channels: &[&mut [f32]], amount: f32) -> f32 {
        let num_frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        if num_frames == 0 {
            return self.gate.get();
        }

        let mean_square = channels
            .iter()
            .map(|c| {
                let r = rms(&c[..num_frames]);
                r * r
            })
            .sum::<f32>()
            / channels.len() as f32;

        let envelope = self.follower.process_span(mean_square.sqrt(), num_frames);
        let open = envelope > gate_threshold(amount);
        self.gate.set_target(if open { 1.0 } else { 0.0 });
        self.gate.advance(num_frames)
    }

    /// Input envelope as last tracked
    pub fn envelope(&self) -> f32 {
        self.follower.level()
    }

    pub fn level(&self) -> f32 {
        self.gate.get()
    }
}

/// Inputs to the auto-gain load estimate, all 0-1
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectLoad {
    pub wet_mix: f32,
    pub filter: f32,
    pub noise: f32,
    pub riser: f32,
    pub tremolo: f32,
    pub delay_mix: f32,
}

impl EffectLoad {
    /// Weighted estimate of how much the chain adds to perceived loudness
    pub fn total(&self) -> f32 {
        0.05 * self.wet_mix
            + 0.02 * self.filter
            + 0.03 * self.noise
            + 0.02 * self.riser
            + 0.01 * self.tremolo
            + 0.02 * self.delay_mix
    }

    /// Compensation gain for this load
    pub fn target_gain(&self) -> f32 {
        1.0 / (1.0 + self.total() * AUTO_GAIN_DEPTH)
    }
}

/// Slow-moving make-up gain applied as the last step of the chain
pub struct AutoGain {
    gain: SmoothedParam,
}

impl AutoGain {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            gain: SmoothedParam::new(1.0, 0.0, 1.0, sample_rate, AUTO_GAIN_SMOOTH_MS),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.gain.set_smooth_time(sample_rate, AUTO_GAIN_SMOOTH_MS);
    }

    pub fn reset(&mut self) {
        self.gain.set_immediate(1.0);
    }

    /// Set the block target; `None` means compensation is switched off
    pub fn set_load(&mut self, load: Option<&EffectLoad>) {
        let target = load.map_or(1.0, EffectLoad::target_gain);
        self.gain.set_target(target);
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    /// Apply the smoothed gain. Leaves the buffer untouched at unity.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.gain.is_settled() && self.gain.get() == 1.0 {
            return;
        }
        let num_frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        for i in 0..num_frames {
            let g = self.gain.tick();
            for ch in channels.iter_mut() {
                ch[i] *= g;
            }
        }
    }
}
