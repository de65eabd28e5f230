//! Factory presets

use crate::params::{NoiseType, ParamError, ParamId, ParameterSet, RiserType};
use NoiseType::{Pink, Vinyl, White};
use RiserType::{NoiseSweep, Saw, Sine, Square, SubDrop};

/// A named bundle of the main performance controls
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub build_up: f32,
    pub filter_intensity: f32,
    pub reverb_mix: f32,
    pub noise_amount: f32,
    pub noise_type: NoiseType,
    pub tremolo_rate: f32,
    pub tremolo_depth: f32,
    pub riser_amount: f32,
    pub riser_type: RiserType,
}

impl Preset {
    /// Every value of the preset as plain parameter values
    pub fn values(&self) -> [(ParamId, f32); 9] {
        [
            (ParamId::BuildUp, self.build_up),
            (ParamId::FilterIntensity, self.filter_intensity),
            (ParamId::ReverbMix, self.reverb_mix),
            (ParamId::NoiseAmount, self.noise_amount),
            (ParamId::NoiseType, self.noise_type.index() as f32),
            (ParamId::TremoloRate, self.tremolo_rate),
            (ParamId::TremoloDepth, self.tremolo_depth),
            (ParamId::RiserAmount, self.riser_amount),
            (ParamId::RiserType, self.riser_type.index() as f32),
        ]
    }
}

const fn preset(
    name: &'static str,
    build_up: f32,
    filter_intensity: f32,
    reverb_mix: f32,
    noise_amount: f32,
    noise_type: NoiseType,
    tremolo_rate: f32,
    tremolo_depth: f32,
    riser_amount: f32,
    riser_type: RiserType,
) -> Preset {
    Preset {
        name,
        build_up,
        filter_intensity,
        reverb_mix,
        noise_amount,
        noise_type,
        tremolo_rate,
        tremolo_depth,
        riser_amount,
        riser_type,
    }
}

pub const FACTORY_PRESETS: [Preset; 10] = [
    preset("Subtle Rise", 25.0, 50.0, 30.0, 0.0, White, 4.0, 0.0, 10.0, Sine),
    preset("Heavy Build", 75.0, 80.0, 60.0, 10.0, Pink, 6.0, 20.0, 30.0, Saw),
    preset("Filter Sweep", 50.0, 100.0, 40.0, 0.0, White, 0.5, 0.0, 0.0, Sine),
    preset("Noise Storm", 60.0, 70.0, 50.0, 80.0, White, 8.0, 40.0, 15.0, NoiseSweep),
    preset("Cathedral", 40.0, 30.0, 90.0, 5.0, Vinyl, 2.0, 10.0, 0.0, Sine),
    preset("Tension Builder", 80.0, 90.0, 70.0, 20.0, Pink, 10.0, 50.0, 60.0, Square),
    preset("Subtle Texture", 30.0, 40.0, 25.0, 15.0, Vinyl, 3.0, 15.0, 5.0, Sine),
    preset("Drop Ready", 90.0, 100.0, 80.0, 30.0, White, 16.0, 70.0, 80.0, SubDrop),
    preset("Ambient Wash", 35.0, 20.0, 85.0, 10.0, Pink, 0.8, 25.0, 0.0, Sine),
    preset("Clean Sweep", 45.0, 75.0, 15.0, 0.0, White, 1.0, 0.0, 20.0, Saw),
];

pub fn count() -> usize {
    FACTORY_PRESETS.len()
}

pub fn get(index: usize) -> Option<&'static Preset> {
    FACTORY_PRESETS.get(index)
}

pub fn find(name: &str) -> Option<&'static Preset> {
    FACTORY_PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Push every value of preset `index` into `params`
pub fn select(params: &ParameterSet, index: usize) -> Result<&'static Preset, ParamError> {
    let preset = get(index).ok_or(ParamError::PresetOutOfRange {
        index,
        count: count(),
    })?;
    for (id, value) in preset.values() {
        params.set(id, value);
    }
    log::info!("Loaded preset '{}'", preset.name);
    Ok(preset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_complete() {
        assert_eq!(count(), 10);
        assert_eq!(FACTORY_PRESETS[0].name, "Subtle Rise");
        assert_eq!(FACTORY_PRESETS[9].name, "Clean Sweep");
    }

    #[test]
    fn test_select_writes_values() {
        let params = ParameterSet::new();
        params.take_changed();
        let preset = select(&params, 7).expect("preset 7 exists");
        assert_eq!(preset.name, "Drop Ready");
        assert_eq!(params.get(ParamId::BuildUp), 90.0);
        assert_eq!(params.get(ParamId::RiserType), RiserType::SubDrop.index() as f32);

        let changed = params.take_changed();
        assert!(changed.contains(ParamId::TremoloRate));
        assert!(!changed.contains(ParamId::DelayMix));
    }

    #[test]
    fn test_out_of_range() {
        let params = ParameterSet::new();
        match select(&params, 10) {
            Err(ParamError::PresetOutOfRange { index, count }) => {
                assert_eq!(index, 10);
                assert_eq!(count, 10);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find("cathedral").map(|p| p.reverb_mix), Some(90.0));
        assert!(find("nope").is_none());
    }
}
