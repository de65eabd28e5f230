//! Filterbank noise vocoder
//!
//! Four analysis band-passes with envelope followers track the live signal.
//! One smoothed noise source per channel runs through four matching
//! synthesis band-passes, each scaled by its band envelope and a make-up
//! gain. The sum goes through a one-pole smoother and two emphasis stages
//! (`y = x + (x - x_prev) * k`) before the output gain.
//!
//! All state lives in the instance. When the smoothed gain settles at zero
//! the whole vocoder is reset, so a later activation never starts from stale
//! band energy.

use super::Effect;
use crate::envelope::EnvelopeFollower;
use crate::filters::{FilterMode, StateVariableFilterTpt};
use crate::gen::noise::NoiseSource;
use crate::params::NoiseType;
use crate::utils::{sanitize_sample, SmoothedParam};

pub const NUM_BANDS: usize = 4;

const CENTER_FREQS: [f32; NUM_BANDS] = [1500.0, 3000.0, 6000.0, 12000.0];
const ANALYSIS_Q: [f32; NUM_BANDS] = [1.2, 1.0, 0.8, 0.8];
const SYNTHESIS_Q_SCALE: f32 = 0.7;

const DARK_GAINS: [f32; NUM_BANDS] = [2.0, 3.0, 4.0, 6.0];
const BRIGHT_GAINS: [f32; NUM_BANDS] = [2.0, 3.0, 6.0, 12.0];

const ATTACK_MS: f32 = 0.5;
const MIN_RELEASE_MS: f32 = 10.0;
const MAX_RELEASE_MS: f32 = 1000.0;
/// ln(10^4): an envelope falls 80 dB over this many time constants
const DECAY_80DB_TIME_CONSTANTS: f32 = 9.210_34;

const NOISE_SMOOTH_CUTOFF: f32 = 0.15;
const NOISE_HIGHPASS_CUTOFF: f32 = 0.15;
const OUTPUT_SMOOTH: f32 = 0.05;
const EMPHASIS_1: f32 = 1.0;
const EMPHASIS_2: f32 = 0.8;
const OUTPUT_SCALE: f32 = 2.0;
const GAIN_SMOOTH_MS: f32 = 20.0;

const MAX_CHANNELS: usize = 2;

/// Release time (ms) for an envelope to fall by 80 dB, from the 0-1 control
pub fn release_ms(release: f32) -> f32 {
    MIN_RELEASE_MS + release.clamp(0.0, 1.0) * (MAX_RELEASE_MS - MIN_RELEASE_MS)
}

/// Per-block vocoder controls
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VocoderSettings {
    /// Target output gain (build-up x noise amount x gate x 0.5)
    pub gain: f32,
    /// 0-1
    pub release: f32,
    /// 0-1
    pub brightness: f32,
    pub noise_type: NoiseType,
}

struct VocoderChannel {
    analysis: [StateVariableFilterTpt; NUM_BANDS],
    synthesis: [StateVariableFilterTpt; NUM_BANDS],
    envelopes: [EnvelopeFollower; NUM_BANDS],
    noise: NoiseSource,
    smooth_noise: [f32; 3],
    highpass_state: f32,
    output_smooth: f32,
    emphasis_prev: [f32; 2],
}

impl VocoderChannel {
    fn new(sample_rate: f32, seed: u64) -> Self {
        Self {
            analysis: std::array::from_fn(|i| {
                StateVariableFilterTpt::new(sample_rate, CENTER_FREQS[i], ANALYSIS_Q[i])
            }),
            synthesis: std::array::from_fn(|i| {
                StateVariableFilterTpt::new(sample_rate, CENTER_FREQS[i], ANALYSIS_Q[i] * SYNTHESIS_Q_SCALE)
            }),
            envelopes: std::array::from_fn(|_| {
                EnvelopeFollower::new(sample_rate, ATTACK_MS, release_ms(0.3) / DECAY_80DB_TIME_CONSTANTS)
            }),
            noise: NoiseSource::new(seed),
            smooth_noise: [0.0; 3],
            highpass_state: 0.0,
            output_smooth: 0.0,
            emphasis_prev: [0.0; 2],
        }
    }

    fn reset(&mut self) {
        for filter in self.analysis.iter_mut().chain(self.synthesis.iter_mut()) {
            filter.reset();
        }
        for env in self.envelopes.iter_mut() {
            env.reset();
        }
        self.noise.reset();
        self.smooth_noise = [0.0; 3];
        self.highpass_state = 0.0;
        self.output_smooth = 0.0;
        self.emphasis_prev = [0.0; 2];
    }

    /// Excitation: smoothed noise blended with high-passed raw noise
    #[inline]
    fn excitation(&mut self, kind: NoiseType, highpass_share: f32) -> f32 {
        let white = self.noise.next(kind);
        let z = &mut self.smooth_noise;
        z[0] += (white - z[0]) * NOISE_SMOOTH_CUTOFF;
        z[1] += (z[0] - z[1]) * NOISE_SMOOTH_CUTOFF;
        z[2] += (z[1] - z[2]) * NOISE_SMOOTH_CUTOFF;
        let smooth = z[2] * 0.7 + white * 0.3;

        let raw = self.noise.white();
        self.highpass_state += (raw - self.highpass_state) * NOISE_HIGHPASS_CUTOFF;
        let highpassed = raw - self.highpass_state;

        smooth * (1.0 - highpass_share) + highpassed * highpass_share
    }

    #[inline]
    fn process_sample(
        &mut self,
        input: f32,
        kind: NoiseType,
        highpass_share: f32,
        band_gains: &[f32; NUM_BANDS],
    ) -> f32 {
        let mut levels = [0.0f32; NUM_BANDS];
        for (band, level) in levels.iter_mut().enumerate() {
            let filtered = self.analysis[band].process(input, FilterMode::BandPass);
            *level = self.envelopes[band].process(filtered);
        }

        let noise = self.excitation(kind, highpass_share);

        let mut output = 0.0;
        for band in 0..NUM_BANDS {
            let filtered = self.synthesis[band].process(noise, FilterMode::BandPass);
            output += filtered * levels[band] * band_gains[band];
        }

        self.output_smooth = sanitize_sample(self.output_smooth + (output - self.output_smooth) * OUTPUT_SMOOTH);

        let y = self.output_smooth;
        let bright = y + (y - self.emphasis_prev[0]) * EMPHASIS_1;
        self.emphasis_prev[0] = y;
        let brighter = bright + (bright - self.emphasis_prev[1]) * EMPHASIS_2;
        self.emphasis_prev[1] = bright;

        brighter
    }

    fn max_envelope(&self) -> f32 {
        self.envelopes.iter().map(|e| e.level()).fold(0.0, f32::max)
    }
}

pub struct Vocoder {
    sample_rate: f32,
    channels: [VocoderChannel; MAX_CHANNELS],
    gain: SmoothedParam,
    release: f32,
    noise_type: NoiseType,
    band_gains: [f32; NUM_BANDS],
    highpass_share: f32,
    idle: bool,
}

impl Vocoder {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut vocoder = Self {
            sample_rate,
            channels: std::array::from_fn(|ch| VocoderChannel::new(sample_rate, seed.wrapping_add(ch as u64))),
            gain: SmoothedParam::new(0.0, 0.0, 10.0, sample_rate, GAIN_SMOOTH_MS),
            release: -1.0,
            noise_type: NoiseType::White,
            band_gains: DARK_GAINS,
            highpass_share: 0.5,
            idle: true,
        };
        vocoder.set_brightness(0.75);
        vocoder.set_release(0.3);
        vocoder
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Release control 0-1 (10-1000 ms to fall 80 dB)
    pub fn set_release(&mut self, release: f32) {
        let release = release.clamp(0.0, 1.0);
        if (release - self.release).abs() < 1e-6 {
            return;
        }
        self.release = release;
        let tau_ms = release_ms(release) / DECAY_80DB_TIME_CONSTANTS;
        for channel in self.channels.iter_mut() {
            for env in channel.envelopes.iter_mut() {
                env.set_release_ms(tau_ms);
            }
        }
    }

    /// Brightness 0-1: band make-up gains and high-passed noise share
    pub fn set_brightness(&mut self, brightness: f32) {
        let b = brightness.clamp(0.0, 1.0);
        for band in 0..NUM_BANDS {
            self.band_gains[band] = DARK_GAINS[band] + (BRIGHT_GAINS[band] - DARK_GAINS[band]) * b;
        }
        self.highpass_share = 0.5 + 0.4 * b;
    }

    pub fn configure(&mut self, settings: &VocoderSettings) {
        self.set_release(settings.release);
        self.set_brightness(settings.brightness);
        self.noise_type = settings.noise_type;
        self.gain.set_target(settings.gain.max(0.0));
    }

    pub fn band_gains(&self) -> [f32; NUM_BANDS] {
        self.band_gains
    }

    /// Largest band envelope across channels
    pub fn max_envelope(&self) -> f32 {
        self.channels.iter().map(|c| c.max_envelope()).fold(0.0, f32::max)
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }
}

impl Effect for Vocoder {
    fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.reset();
        }
        self.gain.set_immediate(0.0);
        self.idle = true;
    }

    /// Analyse the channels and add the vocoded noise into them
    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.gain.is_settled() && self.gain.target() == 0.0 {
            if !self.idle {
                self.reset();
            }
            return;
        }
        self.idle = false;

        let num_channels = channels.len().min(MAX_CHANNELS);
        let num_frames = channels.iter().take(num_channels).map(|c| c.len()).min().unwrap_or(0);

        for i in 0..num_frames {
            let gain = self.gain.tick() * OUTPUT_SCALE;
            for ch in 0..num_channels {
                let input = channels[ch][i];
                let voiced = self.channels[ch].process_sample(
                    input,
                    self.noise_type,
                    self.highpass_share,
                    &self.band_gains,
                );
                channels[ch][i] = input + voiced * gain;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn settings(gain: f32, release: f32) -> VocoderSettings {
        VocoderSettings {
            gain,
            release,
            brightness: 0.75,
            noise_type: NoiseType::White,
        }
    }

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len).map(|i| 0.5 * (TAU * freq * i as f32 / 44100.0).sin()).collect()
    }

    #[test]
    fn test_release_mapping() {
        assert_eq!(release_ms(0.0), 10.0);
        assert_eq!(release_ms(1.0), 1000.0);
        assert!(release_ms(0.5) > release_ms(0.25));
    }

    #[test]
    fn test_brightness_interpolates_gains() {
        let mut vocoder = Vocoder::new(44100.0, 1);
        vocoder.set_brightness(0.0);
        assert_eq!(vocoder.band_gains(), DARK_GAINS);
        vocoder.set_brightness(1.0);
        assert_eq!(vocoder.band_gains(), BRIGHT_GAINS);
        vocoder.set_brightness(0.5);
        assert_eq!(vocoder.band_gains()[3], 9.0);
    }

    #[test]
    fn test_zero_gain_adds_nothing() {
        let mut vocoder = Vocoder::new(44100.0, 1);
        vocoder.configure(&settings(0.0, 0.3));
        let input = sine(3000.0, 4096);
        let mut block = input.clone();
        vocoder.process(&mut [&mut block[..]]);
        assert_eq!(block, input);
        assert!(vocoder.is_idle());
    }

    #[test]
    fn test_follows_input_energy() {
        let mut vocoder = Vocoder::new(44100.0, 1);
        vocoder.configure(&settings(0.25, 0.3));
        let input = sine(3000.0, 8192);
        let mut block = input.clone();
        vocoder.process(&mut [&mut block[..]]);
        let added: f32 = block.iter().zip(&input).map(|(o, i)| (o - i).abs()).sum();
        assert!(added > 0.0, "Vocoder should add noise while the input is active");
        assert!(vocoder.max_envelope() > 0.01);
        assert!(block.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_envelopes_decay_in_silence() {
        let mut vocoder = Vocoder::new(44100.0, 1);
        vocoder.configure(&settings(0.25, 1.0));
        let mut block = sine(6000.0, 22050);
        vocoder.process(&mut [&mut block[..]]);
        assert!(vocoder.max_envelope() > 0.0);

        let mut silence = vec![0.0f32; 44100 * 3 / 2];
        vocoder.process(&mut [&mut silence[..]]);
        assert!(vocoder.max_envelope() < 1e-5, "envelope stuck at {}", vocoder.max_envelope());
        let tail_peak = silence[silence.len() - 1024..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(tail_peak < 1e-5, "residual output {}", tail_peak);
    }

    #[test]
    fn test_resets_once_gain_reaches_zero() {
        let mut vocoder = Vocoder::new(44100.0, 1);
        vocoder.configure(&settings(0.3, 1.0));
        let mut block = sine(1500.0, 8192);
        vocoder.process(&mut [&mut block[..]]);
        assert!(!vocoder.is_idle());

        vocoder.configure(&settings(0.0, 1.0));
        for _ in 0..20 {
            let mut block = sine(1500.0, 4096);
            vocoder.process(&mut [&mut block[..]]);
        }
        assert!(vocoder.is_idle());
        assert_eq!(vocoder.max_envelope(), 0.0);
    }
}
