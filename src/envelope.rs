//! Envelope followers
//!
//! An attack/release one-pole tracker of a signal's rectified amplitude. The
//! vocoder runs one per band at audio rate; the noise gate runs one at block
//! rate on the input RMS via [`EnvelopeFollower::process_span`].

use crate::utils::one_pole_coeff;

/// Envelope levels below this snap to zero so no residual energy lingers
pub const ENVELOPE_FLOOR: f32 = 1e-6;

/// Attack/release amplitude follower
#[derive(Clone, Debug)]
pub struct EnvelopeFollower {
    sample_rate: f32,
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    level: f32,
}

impl EnvelopeFollower {
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `attack_ms` - Attack time constant in milliseconds
    /// * `release_ms` - Release time constant in milliseconds
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut follower = Self {
            sample_rate,
            attack_ms,
            release_ms,
            attack_coeff: 1.0,
            release_coeff: 1.0,
            level: 0.0,
        };
        follower.update_coefficients();
        follower
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = one_pole_coeff(self.sample_rate, self.attack_ms);
        self.release_coeff = one_pole_coeff(self.sample_rate, self.release_ms);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    /// Change the release time constant (no-op if unchanged)
    pub fn set_release_ms(&mut self, release_ms: f32) {
        if (release_ms - self.release_ms).abs() > 1e-4 {
            self.release_ms = release_ms;
            self.release_coeff = one_pole_coeff(self.sample_rate, release_ms);
        }
    }

    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Track one sample; the input is rectified
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let x = input.abs();
        let coeff = if x > self.level {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.level += coeff * (x - self.level);
        if self.level < ENVELOPE_FLOOR || !self.level.is_finite() {
            self.level = 0.0;
        }
        self.level
    }

    /// Track a value held constant over `num_samples` samples in one step
    pub fn process_span(&mut self, input: f32, num_samples: usize) -> f32 {
        if num_samples == 0 {
            return self.level;
        }
        let x = input.abs();
        let coeff = if x > self.level {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        let span_coeff = 1.0 - (1.0 - coeff).powi(num_samples as i32);
        self.level += span_coeff * (x - self.level);
        if self.level < ENVELOPE_FLOOR || !self.level.is_finite() {
            self.level = 0.0;
        }
        self.level
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

/// Root-mean-square of a block of samples
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}
