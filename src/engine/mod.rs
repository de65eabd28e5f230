//! Block orchestrator
//!
//! [`BuildUpEngine`] owns every processor and runs them in a fixed order on
//! each block. All buffers are allocated in [`BuildUpEngine::prepare`]; the
//! audio path only reads atomics, mutates preallocated state and never logs.

pub mod context;
pub mod gain;
pub mod lfo;
pub mod macro_control;

pub use context::{BlockContext, ReverbSettings};
pub use gain::{AutoGain, EffectLoad, NoiseGate};
pub use lfo::Lfo;
pub use macro_control::{macro_targets, MacroController, MacroTargets};

use crate::effects::{apply_smart_pan, apply_tremolo, apply_width, Effect, Reverb, TempoDelay, Vocoder};
use crate::filters::FilterBank;
use crate::gen::Riser;
use crate::params::ParameterSet;
use crate::utils::SmoothedParam;
use std::sync::Arc;

pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 512;
/// Channels the engine processes; any further channels are left untouched
pub const MAX_CHANNELS: usize = 2;

/// Normalised build-up below which the engine is a bit-exact bypass
const BYPASS_EPSILON: f32 = 0.001;
const BUILD_UP_SMOOTH_MS: f32 = 20.0;
const WET_MIX_SMOOTH_MS: f32 = 20.0;
const MODULATION_SMOOTH_MS: f32 = 20.0;

const VOCODER_SEED: u64 = 0x5eed_0001;
const RISER_SEED: u64 = 0x5eed_0002;

/// The build-up effects chain
pub struct BuildUpEngine {
    params: Arc<ParameterSet>,
    sample_rate: f32,
    max_block_size: usize,

    filter: FilterBank,
    vocoder: Vocoder,
    reverb: Reverb,
    riser: Riser,
    delay: TempoDelay,
    lfo: Lfo,
    gate: NoiseGate,
    auto_gain: AutoGain,
    macro_control: MacroController,

    build_up: SmoothedParam,
    wet_mix: SmoothedParam,
    tremolo_depth: SmoothedParam,
    stereo_width: SmoothedParam,
    pan_amount: SmoothedParam,
    bypassed: bool,
    reverb_idle: bool,

    // Scratch, sized in prepare
    wet: [Vec<f32>; MAX_CHANNELS],
    phases: Vec<f32>,
    planar: [Vec<f32>; MAX_CHANNELS],
}

impl BuildUpEngine {
    /// Create an engine prepared for 44.1 kHz and 512-frame blocks
    pub fn new(params: Arc<ParameterSet>) -> Self {
        let sample_rate = DEFAULT_SAMPLE_RATE;
        let mut engine = Self {
            params,
            sample_rate,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            filter: FilterBank::new(sample_rate),
            vocoder: Vocoder::new(sample_rate, VOCODER_SEED),
            reverb: Reverb::new(sample_rate),
            riser: Riser::new(sample_rate, RISER_SEED),
            delay: TempoDelay::new(sample_rate),
            lfo: Lfo::new(sample_rate),
            gate: NoiseGate::new(sample_rate),
            auto_gain: AutoGain::new(sample_rate),
            macro_control: MacroController::new(),
            build_up: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, BUILD_UP_SMOOTH_MS),
            wet_mix: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, WET_MIX_SMOOTH_MS),
            tremolo_depth: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, MODULATION_SMOOTH_MS),
            stereo_width: SmoothedParam::new(1.0, 0.0, 2.0, sample_rate, MODULATION_SMOOTH_MS),
            pan_amount: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, MODULATION_SMOOTH_MS),
            bypassed: true,
            reverb_idle: true,
            wet: [Vec::new(), Vec::new()],
            phases: Vec::new(),
            planar: [Vec::new(), Vec::new()],
        };
        engine.prepare(sample_rate, DEFAULT_MAX_BLOCK_SIZE);
        engine
    }

    /// Allocate every buffer for `sample_rate` and `max_block_size`, then reset
    ///
    /// Not real-time safe; call it whenever the host changes either value.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            log::warn!("Invalid sample rate {}, using {}", sample_rate, DEFAULT_SAMPLE_RATE);
            DEFAULT_SAMPLE_RATE
        };
        let max_block_size = max_block_size.max(1);
        log::info!(
            "Preparing engine: {} Hz, max block {} frames",
            sample_rate,
            max_block_size
        );

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        self.filter = FilterBank::new(sample_rate);
        self.vocoder = Vocoder::new(sample_rate, VOCODER_SEED);
        self.reverb.prepare(sample_rate);
        self.riser.set_sample_rate(sample_rate);
        self.delay.prepare(sample_rate);
        self.lfo.set_sample_rate(sample_rate);
        self.gate.set_sample_rate(sample_rate);
        self.auto_gain.set_sample_rate(sample_rate);
        self.build_up.set_smooth_time(sample_rate, BUILD_UP_SMOOTH_MS);
        self.wet_mix.set_smooth_time(sample_rate, WET_MIX_SMOOTH_MS);
        for smoother in [&mut self.tremolo_depth, &mut self.stereo_width, &mut self.pan_amount] {
            smoother.set_smooth_time(sample_rate, MODULATION_SMOOTH_MS);
        }

        for buffer in self.wet.iter_mut().chain(self.planar.iter_mut()) {
            *buffer = vec![0.0; max_block_size];
        }
        self.phases = vec![0.0; max_block_size];

        self.reset();
    }

    /// Clear all DSP state without reallocating
    pub fn reset(&mut self) {
        log::debug!("Resetting engine state");
        self.filter.reset();
        self.vocoder.reset();
        self.reverb.reset();
        self.riser.reset();
        self.delay.reset();
        self.lfo.reset();
        self.gate.reset();
        self.auto_gain.reset();
        self.macro_control.reset();
        self.build_up.set_immediate(0.0);
        self.wet_mix.set_immediate(0.0);
        self.rest_modulation();
        self.bypassed = true;
        self.reverb_idle = true;
    }

    pub fn params(&self) -> &Arc<ParameterSet> {
        &self.params
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn reverb(&self) -> &Reverb {
        &self.reverb
    }

    /// Reverb accessors. Room, damping, wet, dry and width are overwritten
    /// from build-up on every processed block; freeze mode persists.
    pub fn reverb_mut(&mut self) -> &mut Reverb {
        &mut self.reverb
    }

    pub fn filter(&self) -> &FilterBank {
        &self.filter
    }

    pub fn vocoder(&self) -> &Vocoder {
        &self.vocoder
    }

    pub fn riser(&self) -> &Riser {
        &self.riser
    }

    pub fn delay(&self) -> &TempoDelay {
        &self.delay
    }

    /// Smoothed build-up (0-1) as of the last processed block
    pub fn build_up(&self) -> f32 {
        self.build_up.get()
    }

    pub fn auto_gain(&self) -> f32 {
        self.auto_gain.gain()
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Process planar channels in place
    ///
    /// Only the first two channels are touched. Blocks longer than the
    /// prepared maximum are processed in prepared-size chunks.
    pub fn process(&mut self, channels: &mut [&mut [f32]], bpm: Option<f32>) {
        let chunk = self.max_block_size;
        match channels {
            [] => {}
            [mono] => {
                for block in mono.chunks_mut(chunk) {
                    self.process_block(&mut [block], bpm);
                }
            }
            [left, right, ..] => {
                let num_frames = left.len().min(right.len());
                let lefts = left[..num_frames].chunks_mut(chunk);
                let rights = right[..num_frames].chunks_mut(chunk);
                for (l, r) in lefts.zip(rights) {
                    self.process_block(&mut [l, r], bpm);
                }
            }
        }
    }

    /// Process an interleaved buffer of `num_channels` channels in place
    pub fn process_interleaved(&mut self, buffer: &mut [f32], num_channels: usize, bpm: Option<f32>) {
        if num_channels == 0 {
            return;
        }
        let used = num_channels.min(MAX_CHANNELS);
        let mut planar = std::mem::take(&mut self.planar);

        for frames in buffer.chunks_mut(num_channels * self.max_block_size) {
            let n = frames.len() / num_channels;
            for (i, frame) in frames.chunks_exact(num_channels).enumerate() {
                for ch in 0..used {
                    planar[ch][i] = frame[ch];
                }
            }

            {
                let [left, right] = &mut planar;
                if used == 1 {
                    self.process_block(&mut [&mut left[..n]], bpm);
                } else {
                    self.process_block(&mut [&mut left[..n], &mut right[..n]], bpm);
                }
            }

            for (i, frame) in frames.chunks_exact_mut(num_channels).enumerate() {
                for ch in 0..used {
                    frame[ch] = planar[ch][i];
                }
            }
        }

        self.planar = planar;
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]], bpm: Option<f32>) {
        let num_frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        if num_frames == 0 {
            return;
        }

        // 1. Snapshot and bypass
        let mut snapshot = self.params.snapshot();
        let target = (snapshot.build_up / 100.0).clamp(0.0, 1.0);
        if target < BYPASS_EPSILON {
            if !self.bypassed {
                self.soft_reset();
            }
            self.delay.advance_silent(num_frames);
            return;
        }
        self.bypassed = false;

        // 2-3. Macro automation, build-up smoothing, derived values
        self.macro_control.update(&mut snapshot, &self.params);
        self.build_up.set_target(target);
        let build_up = self.build_up.advance(num_frames);
        let ctx = BlockContext::derive(&snapshot, build_up, self.sample_rate, self.delay.capacity(), bpm);

        // 4. Noise gate from the input level
        let gate = self.gate.process(channels, ctx.gate_amount);

        // 5. Filter
        self.filter.configure(&ctx.filter);
        self.filter.process(channels);

        // 6. Vocoder
        self.vocoder.configure(&ctx.gated_vocoder(gate));
        self.vocoder.process(channels);

        // 7. Reverb on a copy
        self.wet_mix.set_target(ctx.wet_mix);
        let reverb_active = !(self.wet_mix.is_settled() && self.wet_mix.get() == 0.0);
        if reverb_active {
            let r = ctx.reverb;
            self.reverb
                .set_parameters(r.room_size, r.damping, r.wet_level, r.dry_level, r.width);
            let [wet_l, wet_r] = &mut self.wet;
            if channels.len() == 1 {
                wet_l[..num_frames].copy_from_slice(&channels[0][..num_frames]);
                self.reverb.process(&mut [&mut wet_l[..num_frames]]);
            } else {
                wet_l[..num_frames].copy_from_slice(&channels[0][..num_frames]);
                wet_r[..num_frames].copy_from_slice(&channels[1][..num_frames]);
                self.reverb
                    .process(&mut [&mut wet_l[..num_frames], &mut wet_r[..num_frames]]);
            }
            self.reverb_idle = false;
        } else if !self.reverb_idle {
            self.reverb.reset();
            self.reverb_idle = true;
        }

        // 8. Riser
        self.riser.configure(&ctx.riser);
        self.riser.process(channels);

        // 9. Tremolo, width, smart pan
        let phases = &mut self.phases[..num_frames];
        self.lfo.fill(phases, ctx.tremolo_rate);
        self.tremolo_depth.set_target(ctx.tremolo_depth);
        self.stereo_width.set_target(ctx.stereo_width);
        self.pan_amount.set_target(ctx.pan_amount);
        apply_tremolo(channels, phases, &mut self.tremolo_depth);
        apply_width(channels, &mut self.stereo_width);
        apply_smart_pan(channels, phases, &mut self.pan_amount);

        // 10. Delay always runs
        self.delay.configure(&ctx.delay);
        self.delay.process(channels);

        // 11. Reverb mix
        if reverb_active {
            for i in 0..num_frames {
                let w = self.wet_mix.tick();
                for (ch, samples) in channels.iter_mut().enumerate() {
                    samples[i] = samples[i] * (1.0 - w) + self.wet[ch][i] * w;
                }
            }
        }

        // 12. Auto gain
        self.auto_gain.set_load(ctx.load.as_ref());
        self.auto_gain.process(channels);
    }

    /// Clear what the bypass makes inaudible; the delay keeps running
    fn soft_reset(&mut self) {
        self.filter.reset();
        self.vocoder.reset();
        self.reverb.reset();
        self.riser.silence();
        self.gate.reset();
        self.build_up.set_immediate(0.0);
        self.wet_mix.set_immediate(0.0);
        self.macro_control.reset();
        self.rest_modulation();
        self.reverb_idle = true;
        self.bypassed = true;
    }

    /// Tremolo off, unity width, no pan
    fn rest_modulation(&mut self) {
        self.tremolo_depth.set_immediate(0.0);
        self.stereo_width.set_immediate(1.0);
        self.pan_amount.set_immediate(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamId;
    use std::f32::consts::TAU;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len).map(|i| 0.5 * (TAU * freq * i as f32 / 44100.0).sin()).collect()
    }

    #[test]
    fn test_zero_build_up_is_exact() {
        let params = Arc::new(ParameterSet::new());
        params.set(ParamId::ReverbMix, 100.0);
        params.set(ParamId::NoiseAmount, 100.0);
        let mut engine = BuildUpEngine::new(params);

        let input = sine(440.0, 2048);
        let mut left = input.clone();
        let mut right = input.clone();
        engine.process(&mut [&mut left[..], &mut right[..]], Some(128.0));
        assert_eq!(left, input);
        assert_eq!(right, input);
        assert!(engine.is_bypassed());
    }

    #[test]
    fn test_long_blocks_are_chunked() {
        let params = Arc::new(ParameterSet::new());
        params.set(ParamId::BuildUp, 60.0);
        let mut engine = BuildUpEngine::new(params);
        engine.prepare(44100.0, 64);

        let mut block = sine(220.0, 1000);
        engine.process(&mut [&mut block[..]], None);
        assert!(block.iter().all(|s| s.is_finite()));
        assert!(!engine.is_bypassed());
    }

    #[test]
    fn test_entering_bypass_clears_filter() {
        let params = Arc::new(ParameterSet::new());
        params.set(ParamId::BuildUp, 80.0);
        let mut engine = BuildUpEngine::new(Arc::clone(&params));
        let mut block = sine(440.0, 512);
        engine.process(&mut [&mut block[..]], None);
        assert!(engine.filter().is_active());

        params.set(ParamId::BuildUp, 0.0);
        let mut block = sine(440.0, 512);
        engine.process(&mut [&mut block[..]], None);
        assert!(engine.filter().is_neutral());
        assert_eq!(engine.build_up(), 0.0);
    }

    #[test]
    fn test_extra_channels_untouched() {
        let params = Arc::new(ParameterSet::new());
        params.set(ParamId::BuildUp, 70.0);
        let mut engine = BuildUpEngine::new(params);

        let input = sine(330.0, 256);
        let mut buffer: Vec<f32> = input.iter().flat_map(|&s| [s, s, s]).collect();
        engine.process_interleaved(&mut buffer, 3, Some(120.0));
        for (i, frame) in buffer.chunks_exact(3).enumerate() {
            assert_eq!(frame[2], input[i]);
        }
    }

    #[test]
    fn test_freeze_survives_blocks() {
        let params = Arc::new(ParameterSet::new());
        params.set(ParamId::BuildUp, 50.0);
        let mut engine = BuildUpEngine::new(params);
        engine.reverb_mut().set_freeze_mode(1.0);
        let mut block = sine(440.0, 512);
        engine.process(&mut [&mut block[..]], None);
        assert!(engine.reverb().is_frozen());
    }
}
