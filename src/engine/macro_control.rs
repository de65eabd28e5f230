//! Macro automation
//!
//! In Subtle, Aggressive and Epic modes the build-up value drives a fixed set
//! of dependent parameters. Off and Custom leave everything under external
//! control. Computed values are pushed into the [`ParameterSet`] (so the host
//! sees them as changed) and into the block's snapshot.

use crate::params::{MacroMode, ParamId, ParamSnapshot, ParameterSet};

/// Build-up movement (in percent) that triggers re-application
pub const MACRO_HYSTERESIS: f32 = 0.01;

const MAX_TARGETS: usize = 7;

/// Resonance in the 0.5-10 range from a normalised position
fn resonance(normalized: f32) -> f32 {
    0.5 + normalized.clamp(0.0, 1.0) * 9.5
}

/// Parameter values one macro mode produces for a macro position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MacroTargets {
    entries: [(ParamId, f32); MAX_TARGETS],
    len: usize,
}

impl MacroTargets {
    fn empty() -> Self {
        Self {
            entries: [(ParamId::BuildUp, 0.0); MAX_TARGETS],
            len: 0,
        }
    }

    fn push(&mut self, id: ParamId, value: f32) {
        if self.len < MAX_TARGETS {
            self.entries[self.len] = (id, value);
            self.len += 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, f32)> + '_ {
        self.entries[..self.len].iter().copied()
    }

    pub fn get(&self, id: ParamId) -> Option<f32> {
        self.iter().find(|(target, _)| *target == id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Plain parameter values for `mode` at macro position `m` (0-1)
pub fn macro_targets(mode: MacroMode, m: f32) -> MacroTargets {
    let m = m.clamp(0.0, 1.0);
    let mut targets = MacroTargets::empty();
    match mode {
        MacroMode::Off | MacroMode::Custom => {}
        MacroMode::Subtle => {
            targets.push(ParamId::FilterIntensity, 70.0 * m);
            targets.push(ParamId::ReverbMix, 50.0 * m);
            targets.push(ParamId::StereoWidth, 50.0 + 50.0 * m);
        }
        MacroMode::Aggressive => {
            targets.push(ParamId::FilterIntensity, 100.0 * m);
            targets.push(ParamId::ReverbMix, 80.0 * m);
            targets.push(ParamId::NoiseAmount, 50.0 * m * m);
            targets.push(ParamId::FilterResonance, resonance(2.5 / 9.5 + 0.6 * m));
            targets.push(ParamId::StereoWidth, 100.0 - 70.0 * m);
        }
        MacroMode::Epic => {
            targets.push(ParamId::FilterIntensity, 100.0 * m);
            targets.push(ParamId::ReverbMix, 100.0 * m);
            targets.push(ParamId::NoiseAmount, 70.0 * m);
            targets.push(ParamId::RiserAmount, 100.0 * m * m);
            targets.push(ParamId::TremoloDepth, 60.0 * m);
            targets.push(ParamId::FilterResonance, resonance(1.5 / 9.5 + 0.8 * m));
            // U-shaped: dips to 87.5 % at m = 0.25, ends at 150 %
            targets.push(ParamId::StereoWidth, 100.0 * (1.0 - 0.5 * m + m * m));
        }
    }
    targets
}

/// Tracks the last applied macro position and mode
pub struct MacroController {
    last_value: Option<f32>,
    last_mode: MacroMode,
}

impl MacroController {
    pub fn new() -> Self {
        Self {
            last_value: None,
            last_mode: MacroMode::Off,
        }
    }

    /// Forget the last applied position so the next block re-applies
    pub fn reset(&mut self) {
        self.last_value = None;
    }

    /// Apply the active mode if build-up moved past the hysteresis or the
    /// mode changed. Returns true when values were written.
    pub fn update(&mut self, snapshot: &mut ParamSnapshot, params: &ParameterSet) -> bool {
        let mode = snapshot.macro_mode;
        if matches!(mode, MacroMode::Off | MacroMode::Custom) {
            self.last_mode = mode;
            self.last_value = None;
            return false;
        }

        let build_up = snapshot.build_up;
        let moved = match self.last_value {
            Some(last) => (build_up - last).abs() > MACRO_HYSTERESIS,
            None => true,
        };
        if !moved && mode == self.last_mode {
            return false;
        }

        for (id, value) in macro_targets(mode, build_up / 100.0).iter() {
            params.set(id, value);
            snapshot.set(id, value);
        }
        self.last_value = Some(build_up);
        self.last_mode = mode;
        true
    }
}

impl Default for MacroController {
    fn default() -> Self {
        Self::new()
    }
}
