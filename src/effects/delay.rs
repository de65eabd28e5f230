//! Tempo-synced delay
//!
//! One circular buffer per channel, sized for two seconds at the prepared
//! sample rate. The write position advances on every sample whether or not
//! the delay is audible, so the line stays aligned with the host tempo. The
//! feedback path is soft-clipped with `tanh`, and once the mix has settled at
//! zero the line is fed silence so old material cannot come back later.
//!
//! Mix and feedback are smoothed per sample. A change of length (new tempo
//! or division) crossfades from the old read tap to the new one.

use super::soft_saturation::tanh_clip;
use super::Effect;
use crate::params::DelayDivision;
use crate::utils::{sanitize_sample, SmoothedParam};

/// Longest delay the line can hold, in seconds
pub const MAX_DELAY_SECONDS: f32 = 2.0;
/// Tempo used when the host reports none (or nonsense)
pub const DEFAULT_BPM: f32 = 120.0;

const MAX_CHANNELS: usize = 2;
const MIX_SMOOTH_MS: f32 = 30.0;
const FEEDBACK_SMOOTH_MS: f32 = 30.0;
/// Length of the crossfade between read taps
const TAP_FADE_MS: f32 = 50.0;

/// Sanitise a host tempo reading
pub fn effective_bpm(bpm: Option<f32>) -> f32 {
    match bpm {
        Some(b) if b.is_finite() && b > 0.0 => b,
        _ => DEFAULT_BPM,
    }
}

/// Delay length in whole samples for a note division at `bpm`
///
/// # Arguments
/// * `division` - fraction of a beat
/// * `bpm` - tempo; non-positive or non-finite values fall back to 120
/// * `sample_rate` - audio sample rate in Hz
/// * `capacity` - buffer length; the result is clamped to `[1, capacity - 1]`
pub fn delay_samples(division: DelayDivision, bpm: f32, sample_rate: f32, capacity: usize) -> usize {
    let bpm = effective_bpm(Some(bpm));
    let samples = (division.fraction() * 60.0 / bpm * sample_rate).floor();
    let max = capacity.saturating_sub(1).max(1);
    (samples.max(1.0) as usize).min(max)
}

/// Per-block delay controls
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelaySettings {
    /// Delay length in samples
    pub length: usize,
    /// 0-1
    pub mix: f32,
    /// 0-0.9
    pub feedback: f32,
}

pub struct TempoDelay {
    buffers: [Vec<f32>; MAX_CHANNELS],
    write_index: usize,

    // Read tap currently heard, and the one being faded in
    length: usize,
    next_length: usize,
    target_length: usize,
    fade: f32,
    fade_step: f32,

    mix: SmoothedParam,
    feedback: SmoothedParam,
    // Set after prepare/reset: the next configure jumps straight to its values
    fresh: bool,
}

impl TempoDelay {
    pub fn new(sample_rate: f32) -> Self {
        let mut delay = Self {
            buffers: [Vec::new(), Vec::new()],
            write_index: 0,
            length: 1,
            next_length: 1,
            target_length: 1,
            fade: 0.0,
            fade_step: 0.0,
            mix: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, MIX_SMOOTH_MS),
            feedback: SmoothedParam::new(0.0, 0.0, 0.9, sample_rate, FEEDBACK_SMOOTH_MS),
            fresh: true,
        };
        delay.prepare(sample_rate);
        delay
    }

    /// Allocate two seconds per channel and clear
    pub fn prepare(&mut self, sample_rate: f32) {
        let sample_rate = sample_rate.max(1.0);
        let capacity = (sample_rate * MAX_DELAY_SECONDS) as usize + 1;
        for buffer in self.buffers.iter_mut() {
            *buffer = vec![0.0; capacity];
        }
        self.mix.set_smooth_time(sample_rate, MIX_SMOOTH_MS);
        self.feedback.set_smooth_time(sample_rate, FEEDBACK_SMOOTH_MS);
        self.fade_step = 1.0 / (TAP_FADE_MS / 1000.0 * sample_rate).max(1.0);
        let length = self.target_length.clamp(1, capacity - 1);
        self.target_length = length;
        self.reset();
    }

    pub fn capacity(&self) -> usize {
        self.buffers[0].len()
    }

    /// Set the block targets. Mix and feedback glide towards them and a new
    /// length is reached through a crossfade.
    pub fn configure(&mut self, settings: &DelaySettings) {
        let max = self.capacity().saturating_sub(1).max(1);
        self.target_length = settings.length.clamp(1, max);
        self.mix.set_target(settings.mix);
        self.feedback.set_target(settings.feedback);

        if self.fresh {
            self.mix.set_immediate(settings.mix);
            self.feedback.set_immediate(settings.feedback);
            self.jump_to_target_length();
            self.fresh = false;
        }
    }

    /// Length the line is heading to (the tempo-synced value)
    pub fn length(&self) -> usize {
        self.target_length
    }

    pub fn mix(&self) -> f32 {
        self.mix.get()
    }

    /// Advance the write position over `num_frames` of silence
    pub fn advance_silent(&mut self, num_frames: usize) {
        let capacity = self.capacity();
        for _ in 0..num_frames {
            for buffer in self.buffers.iter_mut() {
                buffer[self.write_index] = 0.0;
            }
            self.write_index = (self.write_index + 1) % capacity;
        }
    }

    fn is_fading(&self) -> bool {
        self.fade > 0.0
    }

    fn jump_to_target_length(&mut self) {
        self.length = self.target_length;
        self.next_length = self.target_length;
        self.fade = 0.0;
    }

    /// Start, advance or finish the tap crossfade for one sample.
    /// Returns the weight of `next_length`.
    #[inline]
    fn step_fade(&mut self) -> f32 {
        if !self.is_fading() {
            if self.target_length == self.length {
                return 0.0;
            }
            self.next_length = self.target_length;
            self.fade = self.fade_step;
            return self.fade;
        }
        self.fade += self.fade_step;
        if self.fade >= 1.0 {
            self.length = self.next_length;
            self.fade = 0.0;
            return 0.0;
        }
        self.fade
    }
}

impl Effect for TempoDelay {
    fn reset(&mut self) {
        for buffer in self.buffers.iter_mut() {
            buffer.fill(0.0);
        }
        self.write_index = 0;
        self.jump_to_target_length();
        self.fresh = true;
    }

    /// Run the line over 1 or 2 channels, mixing the delayed signal in
    fn process(&mut self, channels: &mut [&mut [f32]]) {
        let capacity = self.capacity();
        let num_channels = channels.iter().take(MAX_CHANNELS).count();
        let num_frames = channels.iter().take(num_channels).map(|c| c.len()).min().unwrap_or(0);

        for i in 0..num_frames {
            let mix = self.mix.tick();
            let feedback = self.feedback.tick();

            // Nothing audible and nothing to fade: feed the line silence
            if mix == 0.0 && self.mix.is_settled() {
                self.jump_to_target_length();
                for buffer in self.buffers.iter_mut().take(num_channels) {
                    buffer[self.write_index] = 0.0;
                }
                self.write_index = (self.write_index + 1) % capacity;
                continue;
            }

            let weight = self.step_fade();
            let old_read = (self.write_index + capacity - self.length) % capacity;
            let new_read = (self.write_index + capacity - self.next_length) % capacity;
            for ch in 0..num_channels {
                let buffer = &mut self.buffers[ch];
                let input = channels[ch][i];
                let delayed = if weight > 0.0 {
                    buffer[old_read] * (1.0 - weight) + buffer[new_read] * weight
                } else {
                    buffer[old_read]
                };
                channels[ch][i] = input + delayed * mix;
                buffer[self.write_index] = sanitize_sample(input + tanh_clip(delayed * feedback));
            }
            self.write_index = (self.write_index + 1) % capacity;
        }
    }
}
