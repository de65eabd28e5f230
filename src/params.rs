//! Parameter identifiers, ranges and the lock-free parameter set
//!
//! The host (or a UI thread) writes values into a [`ParameterSet`]; the audio
//! thread reads every value exactly once per block through
//! [`ParameterSet::snapshot`]. Values are stored as plain (de-normalised)
//! `f32` bits in `AtomicU32`s so neither side ever locks.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use thiserror::Error;

/// Errors raised by the control surface (never by the audio path)
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("preset index {index} out of range (have {count} presets)")]
    PresetOutOfRange { index: usize, count: usize },

    #[error("invalid choice {index} for parameter '{param}'")]
    InvalidChoice { param: &'static str, index: usize },

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Every parameter the engine reads, in storage order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamId {
    BuildUp,
    FilterIntensity,
    FilterType,
    FilterSlope,
    FilterResonance,
    FilterDrive,
    ReverbMix,
    NoiseAmount,
    NoiseType,
    VocoderRelease,
    VocoderBrightness,
    TremoloRate,
    TremoloDepth,
    RiserAmount,
    RiserType,
    RiserRelease,
    StereoWidth,
    SmartPan,
    NoiseGate,
    AutoGain,
    MacroMode,
    DelayMix,
    DelayTime,
    DelayFeedback,
}

/// Number of parameters in the set
pub const PARAM_COUNT: usize = 24;

impl ParamId {
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::BuildUp,
        ParamId::FilterIntensity,
        ParamId::FilterType,
        ParamId::FilterSlope,
        ParamId::FilterResonance,
        ParamId::FilterDrive,
        ParamId::ReverbMix,
        ParamId::NoiseAmount,
        ParamId::NoiseType,
        ParamId::VocoderRelease,
        ParamId::VocoderBrightness,
        ParamId::TremoloRate,
        ParamId::TremoloDepth,
        ParamId::RiserAmount,
        ParamId::RiserType,
        ParamId::RiserRelease,
        ParamId::StereoWidth,
        ParamId::SmartPan,
        ParamId::NoiseGate,
        ParamId::AutoGain,
        ParamId::MacroMode,
        ParamId::DelayMix,
        ParamId::DelayTime,
        ParamId::DelayFeedback,
    ];

    /// Storage slot of this parameter
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Persisted-state key
    pub fn key(self) -> &'static str {
        match self {
            ParamId::BuildUp => "buildup",
            ParamId::FilterIntensity => "filterIntensity",
            ParamId::FilterType => "filterType",
            ParamId::FilterSlope => "filterSlope",
            ParamId::FilterResonance => "filterResonance",
            ParamId::FilterDrive => "filterDrive",
            ParamId::ReverbMix => "reverbMix",
            ParamId::NoiseAmount => "noiseAmount",
            ParamId::NoiseType => "noiseType",
            ParamId::VocoderRelease => "vocoderRelease",
            ParamId::VocoderBrightness => "vocoderBrightness",
            ParamId::TremoloRate => "tremoloRate",
            ParamId::TremoloDepth => "tremoloDepth",
            ParamId::RiserAmount => "riserAmount",
            ParamId::RiserType => "riserType",
            ParamId::RiserRelease => "riserRelease",
            ParamId::StereoWidth => "stereoWidth",
            ParamId::SmartPan => "smartPan",
            ParamId::NoiseGate => "noiseGate",
            ParamId::AutoGain => "autoGain",
            ParamId::MacroMode => "macroMode",
            ParamId::DelayMix => "delayMix",
            ParamId::DelayTime => "delayTime",
            ParamId::DelayFeedback => "delayFeedback",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.key() == key)
    }

    /// Plain value range (min, max). Discrete parameters span their choice indices.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::FilterResonance => (0.5, 10.0),
            ParamId::TremoloRate => (0.1, 20.0),
            ParamId::RiserRelease => (0.01, 5.0),
            ParamId::StereoWidth => (0.0, 200.0),
            ParamId::DelayFeedback => (0.0, 90.0),
            _ => match self.choice_count() {
                Some(count) => (0.0, (count - 1) as f32),
                None => (0.0, 100.0),
            },
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            ParamId::BuildUp => 0.0,
            ParamId::FilterIntensity => 75.0,
            ParamId::FilterType => FilterType::HighPass.index() as f32,
            ParamId::FilterSlope => FilterSlope::Db12.index() as f32,
            ParamId::FilterResonance => 2.0,
            ParamId::FilterDrive => 0.0,
            ParamId::ReverbMix => 50.0,
            ParamId::NoiseAmount => 0.0,
            ParamId::NoiseType => NoiseType::White.index() as f32,
            ParamId::VocoderRelease => 30.0,
            ParamId::VocoderBrightness => 75.0,
            ParamId::TremoloRate => 4.0,
            ParamId::TremoloDepth => 0.0,
            ParamId::RiserAmount => 0.0,
            ParamId::RiserType => RiserType::Sine.index() as f32,
            ParamId::RiserRelease => 0.1,
            ParamId::StereoWidth => 100.0,
            ParamId::SmartPan => 0.0,
            ParamId::NoiseGate => 30.0,
            ParamId::AutoGain => 1.0,
            ParamId::MacroMode => MacroMode::Off.index() as f32,
            ParamId::DelayMix => 0.0,
            ParamId::DelayTime => DelayDivision::Quarter.index() as f32,
            ParamId::DelayFeedback => 30.0,
        }
    }

    /// Number of choices for discrete parameters, `None` for continuous ones
    pub fn choice_count(self) -> Option<usize> {
        match self {
            ParamId::FilterType => Some(FilterType::COUNT),
            ParamId::FilterSlope => Some(FilterSlope::COUNT),
            ParamId::NoiseType => Some(NoiseType::COUNT),
            ParamId::RiserType => Some(RiserType::COUNT),
            ParamId::MacroMode => Some(MacroMode::COUNT),
            ParamId::DelayTime => Some(DelayDivision::COUNT),
            ParamId::AutoGain => Some(2),
            _ => None,
        }
    }

    /// Clamp (and for discrete parameters, round) a plain value into range
    pub fn sanitize(self, value: f32) -> f32 {
        let (min, max) = self.range();
        let value = if value.is_finite() {
            value
        } else {
            self.default_value()
        };
        let clamped = value.clamp(min, max);
        if self.choice_count().is_some() {
            clamped.round()
        } else {
            clamped
        }
    }
}

fn choice_index(value: f32, count: usize) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value.round() as usize).min(count - 1)
}

/// Filter routing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    #[default]
    HighPass,
    LowPass,
    DualSweep,
}

impl FilterType {
    pub const COUNT: usize = 3;

    pub fn from_value(value: f32) -> Self {
        match choice_index(value, Self::COUNT) {
            0 => FilterType::HighPass,
            1 => FilterType::LowPass,
            _ => FilterType::DualSweep,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Filter steepness selector: 1-4 cascaded stages
///
/// The names are the selector labels. Each stage is a 2-pole TPT SVF, so the
/// real stopband slope is 12 dB/oct per stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterSlope {
    Db6,
    #[default]
    Db12,
    Db18,
    Db24,
}

impl FilterSlope {
    pub const COUNT: usize = 4;

    pub fn from_value(value: f32) -> Self {
        match choice_index(value, Self::COUNT) {
            0 => FilterSlope::Db6,
            1 => FilterSlope::Db12,
            2 => FilterSlope::Db18,
            _ => FilterSlope::Db24,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of cascaded filter stages (1-4)
    pub fn stages(self) -> usize {
        self.index() + 1
    }
}

/// Colour of the noise fed into the vocoder
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseType {
    #[default]
    White,
    Pink,
    Vinyl,
}

impl NoiseType {
    pub const COUNT: usize = 3;

    pub fn from_value(value: f32) -> Self {
        match choice_index(value, Self::COUNT) {
            0 => NoiseType::White,
            1 => NoiseType::Pink,
            _ => NoiseType::Vinyl,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Riser algorithm
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiserType {
    #[default]
    Sine,
    Saw,
    Square,
    NoiseSweep,
    SubDrop,
}

impl RiserType {
    pub const COUNT: usize = 5;

    pub fn from_value(value: f32) -> Self {
        match choice_index(value, Self::COUNT) {
            0 => RiserType::Sine,
            1 => RiserType::Saw,
            2 => RiserType::Square,
            3 => RiserType::NoiseSweep,
            _ => RiserType::SubDrop,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Macro automation mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroMode {
    #[default]
    Off,
    Subtle,
    Aggressive,
    Epic,
    Custom,
}

impl MacroMode {
    pub const COUNT: usize = 5;

    pub fn from_value(value: f32) -> Self {
        match choice_index(value, Self::COUNT) {
            0 => MacroMode::Off,
            1 => MacroMode::Subtle,
            2 => MacroMode::Aggressive,
            3 => MacroMode::Epic,
            _ => MacroMode::Custom,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Tempo-synced delay time as a fraction of one beat
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayDivision {
    Half,
    Third,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
}

impl DelayDivision {
    pub const COUNT: usize = 5;

    pub fn from_value(value: f32) -> Self {
        match choice_index(value, Self::COUNT) {
            0 => DelayDivision::Half,
            1 => DelayDivision::Third,
            2 => DelayDivision::Quarter,
            3 => DelayDivision::Eighth,
            _ => DelayDivision::Sixteenth,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn fraction(self) -> f32 {
        match self {
            DelayDivision::Half => 0.5,
            DelayDivision::Third => 1.0 / 3.0,
            DelayDivision::Quarter => 0.25,
            DelayDivision::Eighth => 0.125,
            DelayDivision::Sixteenth => 0.0625,
        }
    }
}

/// Set of parameters flagged as changed since the last `take_changed`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangedParams(u32);

impl ChangedParams {
    pub fn contains(&self, id: ParamId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ParamId> + '_ {
        ParamId::ALL.iter().copied().filter(move |id| self.contains(*id))
    }
}

/// Lock-free parameter storage shared between the control and audio threads
pub struct ParameterSet {
    values: [AtomicU32; PARAM_COUNT],
    changed: AtomicU32,
    version: AtomicU64,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self {
            values: ParamId::ALL.map(|id| AtomicU32::new(id.default_value().to_bits())),
            changed: AtomicU32::new(0),
            version: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Set a plain value (clamped to range) and flag it as changed
    pub fn set(&self, id: ParamId, value: f32) {
        let value = id.sanitize(value);
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
        self.changed.fetch_or(1 << id.index(), Ordering::Release);
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Value mapped linearly onto 0-1 over the parameter range
    pub fn get_normalized(&self, id: ParamId) -> f32 {
        let (min, max) = id.range();
        (self.get(id) - min) / (max - min)
    }

    pub fn set_normalized(&self, id: ParamId, normalized: f32) {
        let (min, max) = id.range();
        self.set(id, min + normalized.clamp(0.0, 1.0) * (max - min));
    }

    /// Select a choice of a discrete parameter by index
    pub fn set_choice(&self, id: ParamId, index: usize) -> Result<(), ParamError> {
        match id.choice_count() {
            Some(count) if index < count => {
                self.set(id, index as f32);
                Ok(())
            }
            _ => Err(ParamError::InvalidChoice {
                param: id.key(),
                index,
            }),
        }
    }

    /// Collect and clear the set of parameters written since the last call
    pub fn take_changed(&self) -> ChangedParams {
        ChangedParams(self.changed.swap(0, Ordering::Acquire))
    }

    /// Monotonic counter bumped on every write
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Read every parameter once
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot::from_fn(|id| self.get(id))
    }

    /// Write every value of a snapshot into the set
    pub fn apply_snapshot(&self, snapshot: &ParamSnapshot) {
        for id in ParamId::ALL {
            self.set(id, snapshot.get(id));
        }
    }

    /// Persisted state as key/value pairs
    pub fn save_state(&self) -> Vec<(&'static str, f32)> {
        ParamId::ALL.iter().map(|&id| (id.key(), self.get(id))).collect()
    }

    /// Restore persisted state. Pairs may come in any order; unknown keys are
    /// skipped and returned as errors.
    pub fn load_state<I, K>(&self, pairs: I) -> Vec<ParamError>
    where
        I: IntoIterator<Item = (K, f32)>,
        K: AsRef<str>,
    {
        let mut errors = Vec::new();
        let mut restored = 0usize;
        for (key, value) in pairs {
            match ParamId::from_key(key.as_ref()) {
                Some(id) => {
                    self.set(id, value);
                    restored += 1;
                }
                None => {
                    log::warn!("Ignoring unknown parameter '{}' in saved state", key.as_ref());
                    errors.push(ParamError::UnknownParameter(key.as_ref().to_string()));
                }
            }
        }
        log::info!("Restored {} parameters from saved state", restored);
        errors
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new()
    }
}

/// All parameter values as read at the start of one block
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSnapshot {
    #[serde(rename = "buildup")]
    pub build_up: f32,
    pub filter_intensity: f32,
    pub filter_type: FilterType,
    pub filter_slope: FilterSlope,
    pub filter_resonance: f32,
    pub filter_drive: f32,
    pub reverb_mix: f32,
    pub noise_amount: f32,
    pub noise_type: NoiseType,
    pub vocoder_release: f32,
    pub vocoder_brightness: f32,
    pub tremolo_rate: f32,
    pub tremolo_depth: f32,
    pub riser_amount: f32,
    pub riser_type: RiserType,
    pub riser_release: f32,
    pub stereo_width: f32,
    pub smart_pan: f32,
    pub noise_gate: f32,
    pub auto_gain: bool,
    pub macro_mode: MacroMode,
    pub delay_mix: f32,
    pub delay_time: DelayDivision,
    pub delay_feedback: f32,
}

impl ParamSnapshot {
    fn from_fn(read: impl Fn(ParamId) -> f32) -> Self {
        Self {
            build_up: read(ParamId::BuildUp),
            filter_intensity: read(ParamId::FilterIntensity),
            filter_type: FilterType::from_value(read(ParamId::FilterType)),
            filter_slope: FilterSlope::from_value(read(ParamId::FilterSlope)),
            filter_resonance: read(ParamId::FilterResonance),
            filter_drive: read(ParamId::FilterDrive),
            reverb_mix: read(ParamId::ReverbMix),
            noise_amount: read(ParamId::NoiseAmount),
            noise_type: NoiseType::from_value(read(ParamId::NoiseType)),
            vocoder_release: read(ParamId::VocoderRelease),
            vocoder_brightness: read(ParamId::VocoderBrightness),
            tremolo_rate: read(ParamId::TremoloRate),
            tremolo_depth: read(ParamId::TremoloDepth),
            riser_amount: read(ParamId::RiserAmount),
            riser_type: RiserType::from_value(read(ParamId::RiserType)),
            riser_release: read(ParamId::RiserRelease),
            stereo_width: read(ParamId::StereoWidth),
            smart_pan: read(ParamId::SmartPan),
            noise_gate: read(ParamId::NoiseGate),
            auto_gain: read(ParamId::AutoGain) >= 0.5,
            macro_mode: MacroMode::from_value(read(ParamId::MacroMode)),
            delay_mix: read(ParamId::DelayMix),
            delay_time: DelayDivision::from_value(read(ParamId::DelayTime)),
            delay_feedback: read(ParamId::DelayFeedback),
        }
    }

    /// Plain value of one parameter (choice index for discrete ones)
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::BuildUp => self.build_up,
            ParamId::FilterIntensity => self.filter_intensity,
            ParamId::FilterType => self.filter_type.index() as f32,
            ParamId::FilterSlope => self.filter_slope.index() as f32,
            ParamId::FilterResonance => self.filter_resonance,
            ParamId::FilterDrive => self.filter_drive,
            ParamId::ReverbMix => self.reverb_mix,
            ParamId::NoiseAmount => self.noise_amount,
            ParamId::NoiseType => self.noise_type.index() as f32,
            ParamId::VocoderRelease => self.vocoder_release,
            ParamId::VocoderBrightness => self.vocoder_brightness,
            ParamId::TremoloRate => self.tremolo_rate,
            ParamId::TremoloDepth => self.tremolo_depth,
            ParamId::RiserAmount => self.riser_amount,
            ParamId::RiserType => self.riser_type.index() as f32,
            ParamId::RiserRelease => self.riser_release,
            ParamId::StereoWidth => self.stereo_width,
            ParamId::SmartPan => self.smart_pan,
            ParamId::NoiseGate => self.noise_gate,
            ParamId::AutoGain => {
                if self.auto_gain {
                    1.0
                } else {
                    0.0
                }
            }
            ParamId::MacroMode => self.macro_mode.index() as f32,
            ParamId::DelayMix => self.delay_mix,
            ParamId::DelayTime => self.delay_time.index() as f32,
            ParamId::DelayFeedback => self.delay_feedback,
        }
    }

    /// Overwrite one value in place (clamped like `ParameterSet::set`)
    pub fn set(&mut self, id: ParamId, value: f32) {
        let v = id.sanitize(value);
        match id {
            ParamId::BuildUp => self.build_up = v,
            ParamId::FilterIntensity => self.filter_intensity = v,
            ParamId::FilterType => self.filter_type = FilterType::from_value(v),
            ParamId::FilterSlope => self.filter_slope = FilterSlope::from_value(v),
            ParamId::FilterResonance => self.filter_resonance = v,
            ParamId::FilterDrive => self.filter_drive = v,
            ParamId::ReverbMix => self.reverb_mix = v,
            ParamId::NoiseAmount => self.noise_amount = v,
            ParamId::NoiseType => self.noise_type = NoiseType::from_value(v),
            ParamId::VocoderRelease => self.vocoder_release = v,
            ParamId::VocoderBrightness => self.vocoder_brightness = v,
            ParamId::TremoloRate => self.tremolo_rate = v,
            ParamId::TremoloDepth => self.tremolo_depth = v,
            ParamId::RiserAmount => self.riser_amount = v,
            ParamId::RiserType => self.riser_type = RiserType::from_value(v),
            ParamId::RiserRelease => self.riser_release = v,
            ParamId::StereoWidth => self.stereo_width = v,
            ParamId::SmartPan => self.smart_pan = v,
            ParamId::NoiseGate => self.noise_gate = v,
            ParamId::AutoGain => self.auto_gain = v >= 0.5,
            ParamId::MacroMode => self.macro_mode = MacroMode::from_value(v),
            ParamId::DelayMix => self.delay_mix = v,
            ParamId::DelayTime => self.delay_time = DelayDivision::from_value(v),
            ParamId::DelayFeedback => self.delay_feedback = v,
        }
    }

    pub fn to_json(&self) -> Result<String, ParamError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot; out-of-range values are clamped
    pub fn from_json(json: &str) -> Result<Self, ParamError> {
        let mut snapshot: ParamSnapshot = serde_json::from_str(json)?;
        for id in ParamId::ALL {
            let value = snapshot.get(id);
            snapshot.set(id, value);
        }
        Ok(snapshot)
    }
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self::from_fn(ParamId::default_value)
    }
}
