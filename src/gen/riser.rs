//! Riser synthesizer
//!
//! Five sweeping voices driven by the build-up control. The amplitude
//! envelope attacks over a fixed 50 ms time constant and releases over the
//! user's `riserRelease`. The base frequency glides per sample (100 ms
//! time constant) and vibrato is applied on top of the glided value. Phases
//! keep running while the voice is silent so a re-trigger never starts
//! from a phase jump.

use crate::filters::{FilterMode, StateVariableFilterTpt};
use crate::gen::noise::NoiseSource;
use crate::params::RiserType;
use crate::utils::{one_pole_coeff, SmoothedParam};
use std::f32::consts::TAU;

/// Peak riser level at full build-up and amount
pub const RISER_LEVEL_SCALE: f32 = 0.15;
/// Levels below this produce no output
pub const RISER_SILENCE: f32 = 1e-4;

const ATTACK_MS: f32 = 50.0;
const FREQ_SMOOTH_MS: f32 = 100.0;

/// Top of the sine sweep
pub const SINE_TOP_HZ: f32 = 4000.0;
const SINE_BOTTOM_HZ: f32 = 50.0;
const SUB_TOP_HZ: f32 = 2000.0;
const SUB_BOTTOM_HZ: f32 = 30.0;

/// Per-block riser controls
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiserSettings {
    pub riser_type: RiserType,
    /// 0-1
    pub build_up: f32,
    /// 0-1
    pub amount: f32,
    /// Release time constant in seconds
    pub release_s: f32,
}

impl RiserSettings {
    pub fn target_level(&self) -> f32 {
        self.build_up * self.amount * RISER_LEVEL_SCALE
    }

    /// Base (pre-vibrato) frequency for the selected voice
    pub fn target_frequency(&self) -> f32 {
        let bu = self.build_up.clamp(0.0, 1.0);
        // Saw and square share the sine's start and stretch only the sweep
        let sweep = |span_scale: f32| SINE_BOTTOM_HZ + bu * bu * bu * (SINE_TOP_HZ - SINE_BOTTOM_HZ) * span_scale;
        match self.riser_type {
            RiserType::Sine => sweep(1.0),
            RiserType::Saw => sweep(1.2),
            RiserType::Square => sweep(0.8),
            RiserType::NoiseSweep => 100.0 + bu * bu * 8000.0,
            RiserType::SubDrop => {
                let inv = 1.0 - bu;
                SUB_BOTTOM_HZ + inv * inv * (SUB_TOP_HZ - SUB_BOTTOM_HZ)
            }
        }
    }

    fn vibrato_scale(&self) -> f32 {
        match self.riser_type {
            RiserType::Sine => 1.0,
            RiserType::Saw => 0.5,
            RiserType::Square => 0.3,
            RiserType::NoiseSweep => 0.0,
            RiserType::SubDrop => 0.2,
        }
    }
}

pub struct Riser {
    sample_rate: f32,
    settings: RiserSettings,

    level: f32,
    attack_coeff: f32,
    release_coeff: f32,

    base_freq: SmoothedParam,
    phase: f32,
    vibrato_phase: f32,

    noise: NoiseSource,
    sweep_filter: StateVariableFilterTpt,
}

impl Riser {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let settings = RiserSettings {
            riser_type: RiserType::Sine,
            build_up: 0.0,
            amount: 0.0,
            release_s: 0.1,
        };
        let start_freq = settings.target_frequency();
        Self {
            sample_rate,
            settings,
            level: 0.0,
            attack_coeff: one_pole_coeff(sample_rate, ATTACK_MS),
            release_coeff: one_pole_coeff(sample_rate, 100.0),
            base_freq: SmoothedParam::new(start_freq, 1.0, 20000.0, sample_rate, FREQ_SMOOTH_MS),
            phase: 0.0,
            vibrato_phase: 0.0,
            noise: NoiseSource::new(seed),
            sweep_filter: StateVariableFilterTpt::new(sample_rate, 100.0, 2.0),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.attack_coeff = one_pole_coeff(sample_rate, ATTACK_MS);
        self.release_coeff = one_pole_coeff(sample_rate, self.settings.release_s * 1000.0);
        self.base_freq.set_smooth_time(sample_rate, FREQ_SMOOTH_MS);
        self.sweep_filter.set_sample_rate(sample_rate);
    }

    /// Full reset: silence, glide restarted at the current target, phases zeroed
    pub fn reset(&mut self) {
        self.level = 0.0;
        self.base_freq.set_immediate(self.settings.target_frequency());
        self.phase = 0.0;
        self.vibrato_phase = 0.0;
        self.noise.reset();
        self.sweep_filter.reset();
    }

    /// Drop the level to zero without touching the phases
    pub fn silence(&mut self) {
        self.level = 0.0;
        self.sweep_filter.reset();
    }

    /// Apply per-block settings
    pub fn configure(&mut self, settings: &RiserSettings) {
        if (settings.release_s - self.settings.release_s).abs() > 1e-6 {
            self.release_coeff = one_pole_coeff(self.sample_rate, settings.release_s.max(0.001) * 1000.0);
        }
        self.settings = *settings;
        self.base_freq.set_target(settings.target_frequency());

        let bu = settings.build_up.clamp(0.0, 1.0);
        if settings.riser_type == RiserType::NoiseSweep {
            self.sweep_filter.set_params(self.base_freq.get(), 2.0 + 3.0 * bu);
        }
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Glided base frequency, before vibrato
    #[inline]
    pub fn base_frequency(&self) -> f32 {
        self.base_freq.get()
    }

    pub fn is_silent(&self) -> bool {
        self.level < RISER_SILENCE
    }

    /// Produce one mono sample
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let target = self.settings.target_level();
        let coeff = if target > self.level {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.level += coeff * (target - self.level);
        if target == 0.0 && self.level < RISER_SILENCE {
            self.level = 0.0;
        }

        let bu = self.settings.build_up.clamp(0.0, 1.0);
        let base = self.base_freq.tick();

        let vibrato_rate = 4.0 + 2.0 * bu;
        let vibrato_depth = (0.02 + 0.05 * bu) * self.settings.vibrato_scale();
        let vibrato = self.vibrato_phase.sin() * vibrato_depth;
        self.vibrato_phase += TAU * vibrato_rate / self.sample_rate;
        if self.vibrato_phase >= TAU {
            self.vibrato_phase -= TAU;
        }

        let freq = base * (1.0 + vibrato);
        let current_phase = self.phase;
        self.phase += freq / self.sample_rate;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        if self.level < RISER_SILENCE {
            return 0.0;
        }

        let level = self.level;
        match self.settings.riser_type {
            RiserType::Sine => (TAU * current_phase).sin() * level,
            RiserType::Saw => (2.0 * current_phase - 1.0) * level,
            RiserType::Square => {
                let s = if (TAU * current_phase).sin() > 0.0 { 1.0 } else { -1.0 };
                s * level * 0.7
            }
            RiserType::NoiseSweep => {
                self.sweep_filter.set_params(base, 2.0 + 3.0 * bu);
                let n = self.noise.white() * level * 2.0;
                self.sweep_filter.process(n, FilterMode::BandPass)
            }
            RiserType::SubDrop => (TAU * current_phase).sin() * level * 1.5,
        }
    }

    /// Add the riser into every channel
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        let num_frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        for i in 0..num_frames {
            let s = self.next_sample();
            if s != 0.0 {
                for ch in channels.iter_mut() {
                    ch[i] += s;
                }
            }
        }
    }
}
