//! Cascaded high-pass / low-pass / dual-sweep filter bank
//!
//! The slope selector (labelled 6-24 dB/oct) picks one to four 2-pole TPT
//! stages per pass, each adding 12 dB/oct. Only the first stage carries the
//! musical resonance; cascaded stages sit at Q 0.707 so
//! resonant peaks do not stack. Below [`FILTER_ACTIVE_EPSILON`] the bank
//! does no processing at all and its stages are parked at neutral settings,
//! which makes the bypass bit-exact.

use super::state_variable_tpt::{FilterMode, StateVariableFilterTpt, MAX_CUTOFF_HZ, MIN_CUTOFF_HZ};
use crate::effects::soft_saturation::drive;
use crate::effects::Effect;
use crate::params::{FilterSlope, FilterType};

/// Maximum number of cascaded stages per pass
pub const MAX_STAGES: usize = 4;
/// Q used by cascaded stages 2-4
pub const CASCADE_Q: f32 = 0.707;
/// Build-up x intensity below which the filter is bypassed
pub const FILTER_ACTIVE_EPSILON: f32 = 0.001;
/// Minimum gap between the dual-sweep cutoffs
pub const DUAL_MIN_GAP_HZ: f32 = 2000.0;

const MAX_CHANNELS: usize = 2;

/// Per-block filter settings derived from the parameter snapshot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSettings {
    pub filter_type: FilterType,
    pub stages: usize,
    pub highpass_hz: f32,
    pub lowpass_hz: f32,
    pub resonance: f32,
    /// 0-1
    pub drive: f32,
    /// build-up x intensity, 0-1
    pub amount: f32,
}

impl FilterSettings {
    /// Map build-up x intensity onto cutoffs and resonance
    ///
    /// # Arguments
    /// * `amount` - build-up (0-1) times filter intensity (0-1)
    /// * `resonance` - user resonance, 0.5-10
    /// * `drive` - filter drive, 0-1
    pub fn derive(
        filter_type: FilterType,
        slope: FilterSlope,
        amount: f32,
        resonance: f32,
        drive: f32,
    ) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let base_res = (0.5 + (resonance - 0.5) * (1.0 + 2.0 * amount)).min(10.0);

        let (highpass_hz, lowpass_hz, resonance) = match filter_type {
            FilterType::HighPass => (20.0 + amount * 1980.0, MAX_CUTOFF_HZ, base_res),
            FilterType::LowPass => (MIN_CUTOFF_HZ, 20000.0 - amount * 19500.0, base_res),
            FilterType::DualSweep => {
                let curve = amount * amount;
                let low_cut = 20.0 + curve * 3000.0;
                let high_cut = (20000.0 - curve * 12000.0).max(low_cut + DUAL_MIN_GAP_HZ);
                (low_cut, high_cut, (base_res * 1.2).min(8.0))
            }
        };

        Self {
            filter_type,
            stages: slope.stages(),
            highpass_hz: highpass_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ),
            lowpass_hz: lowpass_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ),
            resonance,
            drive: drive.clamp(0.0, 1.0),
            amount,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.amount >= FILTER_ACTIVE_EPSILON
    }
}

/// One chain of cascaded stages
#[derive(Clone, Debug)]
struct Cascade {
    stages: [StateVariableFilterTpt; MAX_STAGES],
    mode: FilterMode,
}

impl Cascade {
    fn new(sample_rate: f32, mode: FilterMode) -> Self {
        let neutral = neutral_cutoff(mode);
        Self {
            stages: std::array::from_fn(|_| StateVariableFilterTpt::new(sample_rate, neutral, CASCADE_Q)),
            mode,
        }
    }

    fn configure(&mut self, cutoff: f32, resonance: f32, active_stages: usize) {
        for (i, stage) in self.stages.iter_mut().enumerate() {
            if i >= active_stages {
                stage.reset();
                continue;
            }
            let q = if i == 0 { resonance } else { CASCADE_Q };
            stage.set_params(cutoff, q);
        }
    }

    fn park(&mut self) {
        let neutral = neutral_cutoff(self.mode);
        for stage in self.stages.iter_mut() {
            stage.set_params(neutral, CASCADE_Q);
            stage.reset();
        }
    }

    #[inline]
    fn process(&mut self, mut x: f32, active_stages: usize) -> f32 {
        for stage in self.stages[..active_stages].iter_mut() {
            x = stage.process(x, self.mode);
        }
        x
    }

    fn is_clear(&self) -> bool {
        self.stages.iter().all(|s| s.is_clear())
    }
}

fn neutral_cutoff(mode: FilterMode) -> f32 {
    match mode {
        FilterMode::HighPass => MIN_CUTOFF_HZ,
        _ => MAX_CUTOFF_HZ,
    }
}

/// Stereo cascaded filter bank
pub struct FilterBank {
    highpass: [Cascade; MAX_CHANNELS],
    lowpass: [Cascade; MAX_CHANNELS],
    settings: Option<FilterSettings>,
}

impl FilterBank {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            highpass: std::array::from_fn(|_| Cascade::new(sample_rate, FilterMode::HighPass)),
            lowpass: std::array::from_fn(|_| Cascade::new(sample_rate, FilterMode::LowPass)),
            settings: None,
        }
    }

    /// Push per-block settings to every active stage
    pub fn configure(&mut self, settings: &FilterSettings) {
        if !settings.is_active() {
            if self.settings.is_some() {
                self.reset();
            }
            return;
        }

        let stages = settings.stages.clamp(1, MAX_STAGES);
        let (use_hp, use_lp) = Self::routing(settings.filter_type);

        for ch in 0..MAX_CHANNELS {
            if use_hp {
                self.highpass[ch].configure(settings.highpass_hz, settings.resonance, stages);
            } else {
                self.highpass[ch].park();
            }
            if use_lp {
                self.lowpass[ch].configure(settings.lowpass_hz, settings.resonance, stages);
            } else {
                self.lowpass[ch].park();
            }
        }
        self.settings = Some(FilterSettings { stages, ..*settings });
    }

    fn routing(filter_type: FilterType) -> (bool, bool) {
        match filter_type {
            FilterType::HighPass => (true, false),
            FilterType::LowPass => (false, true),
            FilterType::DualSweep => (true, true),
        }
    }

    /// True while the bank is filtering
    pub fn is_active(&self) -> bool {
        self.settings.is_some()
    }

    /// True when every stage is parked with empty state
    pub fn is_neutral(&self) -> bool {
        self.settings.is_none()
            && self.highpass.iter().all(|c| c.is_clear())
            && self.lowpass.iter().all(|c| c.is_clear())
    }

    /// Current stage-1 cutoffs (high-pass, low-pass) of the first channel
    pub fn cutoffs(&self) -> (f32, f32) {
        (self.highpass[0].stages[0].cutoff(), self.lowpass[0].stages[0].cutoff())
    }
}

impl Effect for FilterBank {
    /// Clear all state and return every stage to neutral
    fn reset(&mut self) {
        for cascade in self.highpass.iter_mut().chain(self.lowpass.iter_mut()) {
            cascade.park();
        }
        self.settings = None;
    }

    /// Filter 1 or 2 channels in place. No-op while bypassed.
    fn process(&mut self, channels: &mut [&mut [f32]]) {
        let Some(settings) = self.settings else {
            return;
        };
        let (use_hp, use_lp) = Self::routing(settings.filter_type);

        for (ch, samples) in channels.iter_mut().take(MAX_CHANNELS).enumerate() {
            for sample in samples.iter_mut() {
                let mut x = drive(*sample, settings.drive);
                if use_hp {
                    x = self.highpass[ch].process(x, settings.stages);
                }
                if use_lp {
                    x = self.lowpass[ch].process(x, settings.stages);
                }
                *sample = x;
            }
        }
    }
}
