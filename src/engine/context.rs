//! Per-block derived values
//!
//! Everything the chain needs for one block is computed here, once, from the
//! parameter snapshot and the smoothed build-up. The processors then only
//! read from the context, so parameter reads never interleave with audio.

use super::gain::EffectLoad;
use crate::effects::delay::{delay_samples, effective_bpm};
use crate::effects::{DelaySettings, VocoderSettings};
use crate::filters::FilterSettings;
use crate::gen::RiserSettings;
use crate::params::ParamSnapshot;

/// Vocoder output scale applied on top of build-up x noise x gate
const VOCODER_GAIN_SCALE: f32 = 0.5;

/// Reverb controls re-derived from build-up every block
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReverbSettings {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
    pub width: f32,
}

impl ReverbSettings {
    pub fn from_build_up(build_up: f32) -> Self {
        let bu = build_up.clamp(0.0, 1.0);
        Self {
            room_size: 0.3 + 0.65 * bu,
            damping: 0.7 - 0.5 * bu,
            wet_level: 0.2 + 0.6 * bu,
            dry_level: 1.0 - 0.4 * bu,
            width: 0.5 + 0.5 * bu,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockContext {
    /// Smoothed build-up, 0-1
    pub build_up: f32,
    pub filter: FilterSettings,
    pub reverb: ReverbSettings,
    /// Vocoder controls with the gain still ungated
    pub vocoder: VocoderSettings,
    pub riser: RiserSettings,
    pub delay: DelaySettings,
    /// Noise gate control, 0-1
    pub gate_amount: f32,
    pub tremolo_rate: f32,
    /// Tremolo depth scaled by build-up
    pub tremolo_depth: f32,
    /// 0-2, 1 is unity
    pub stereo_width: f32,
    /// Smart pan amount scaled by build-up
    pub pan_amount: f32,
    /// Reverb wet share of the final mix (build-up x reverb mix)
    pub wet_mix: f32,
    /// `None` when auto gain is off
    pub load: Option<EffectLoad>,
}

impl BlockContext {
    /// # Arguments
    /// * `snapshot` - parameter values for this block (after macro automation)
    /// * `build_up` - smoothed build-up, 0-1
    /// * `sample_rate` - current sample rate in Hz
    /// * `delay_capacity` - delay line length in samples
    /// * `bpm` - host tempo, if known
    pub fn derive(
        snapshot: &ParamSnapshot,
        build_up: f32,
        sample_rate: f32,
        delay_capacity: usize,
        bpm: Option<f32>,
    ) -> Self {
        let bu = build_up.clamp(0.0, 1.0);
        let pct = |v: f32| (v / 100.0).clamp(0.0, 1.0);

        let filter_intensity = pct(snapshot.filter_intensity);
        let noise = pct(snapshot.noise_amount);
        let riser_amount = pct(snapshot.riser_amount);
        let tremolo = pct(snapshot.tremolo_depth);
        let delay_mix = pct(snapshot.delay_mix);
        let wet_mix = bu * pct(snapshot.reverb_mix);

        let filter = FilterSettings::derive(
            snapshot.filter_type,
            snapshot.filter_slope,
            bu * filter_intensity,
            snapshot.filter_resonance,
            pct(snapshot.filter_drive),
        );

        let vocoder = VocoderSettings {
            gain: bu * noise * VOCODER_GAIN_SCALE,
            release: pct(snapshot.vocoder_release),
            brightness: pct(snapshot.vocoder_brightness),
            noise_type: snapshot.noise_type,
        };

        let riser = RiserSettings {
            riser_type: snapshot.riser_type,
            build_up: bu,
            amount: riser_amount,
            release_s: snapshot.riser_release,
        };

        let delay = DelaySettings {
            length: delay_samples(snapshot.delay_time, effective_bpm(bpm), sample_rate, delay_capacity),
            mix: delay_mix,
            feedback: (snapshot.delay_feedback / 100.0).clamp(0.0, 0.9),
        };

        let load = snapshot.auto_gain.then(|| EffectLoad {
            wet_mix,
            filter: filter_intensity * bu,
            noise: noise * bu,
            riser: riser_amount * bu,
            tremolo: tremolo * bu,
            delay_mix,
        });

        Self {
            build_up: bu,
            filter,
            reverb: ReverbSettings::from_build_up(bu),
            vocoder,
            riser,
            delay,
            gate_amount: pct(snapshot.noise_gate),
            tremolo_rate: snapshot.tremolo_rate,
            tremolo_depth: tremolo * bu,
            stereo_width: (snapshot.stereo_width / 100.0).clamp(0.0, 2.0),
            pan_amount: pct(snapshot.smart_pan) * bu,
            wet_mix,
            load,
        }
    }

    /// Vocoder settings once the noise gate level for the block is known
    pub fn gated_vocoder(&self, gate: f32) -> VocoderSettings {
        VocoderSettings {
            gain: self.vocoder.gain * gate.clamp(0.0, 1.0),
            ..self.vocoder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DelayDivision, FilterType};

    fn derive(snapshot: &ParamSnapshot, build_up: f32) -> BlockContext {
        BlockContext::derive(snapshot, build_up, 44100.0, 88201, Some(120.0))
    }

    #[test]
    fn test_reverb_follows_build_up() {
        let quiet = ReverbSettings::from_build_up(0.0);
        assert_eq!(quiet.room_size, 0.3);
        assert_eq!(quiet.dry_level, 1.0);
        let full = ReverbSettings::from_build_up(1.0);
        assert!((full.room_size - 0.95).abs() < 1e-6);
        assert!((full.wet_level - 0.8).abs() < 1e-6);
        assert!((full.width - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_defaults_at_half_build_up() {
        let snapshot = ParamSnapshot::default();
        let ctx = derive(&snapshot, 0.5);
        assert_eq!(ctx.filter.filter_type, FilterType::HighPass);
        assert!((ctx.filter.amount - 0.375).abs() < 1e-6);
        assert!((ctx.wet_mix - 0.25).abs() < 1e-6);
        assert_eq!(ctx.vocoder.gain, 0.0);
        assert_eq!(ctx.stereo_width, 1.0);
        assert_eq!(ctx.delay.length, 5512);
        assert!(ctx.load.is_some());
    }

    #[test]
    fn test_delay_uses_default_tempo() {
        let mut snapshot = ParamSnapshot::default();
        snapshot.delay_time = DelayDivision::Eighth;
        let with_host = BlockContext::derive(&snapshot, 0.5, 48000.0, 96001, Some(120.0));
        let without = BlockContext::derive(&snapshot, 0.5, 48000.0, 96001, None);
        assert_eq!(with_host.delay.length, without.delay.length);
        assert_eq!(without.delay.length, 3000);
    }

    #[test]
    fn test_gate_scales_vocoder_gain() {
        let mut snapshot = ParamSnapshot::default();
        snapshot.noise_amount = 100.0;
        let ctx = derive(&snapshot, 1.0);
        assert_eq!(ctx.vocoder.gain, 0.5);
        assert_eq!(ctx.gated_vocoder(0.5).gain, 0.25);
        assert_eq!(ctx.gated_vocoder(0.0).gain, 0.0);
    }

    #[test]
    fn test_auto_gain_off_has_no_load() {
        let mut snapshot = ParamSnapshot::default();
        snapshot.auto_gain = false;
        assert!(derive(&snapshot, 1.0).load.is_none());
    }
}
