//! Freeverb-topology reverb
//!
//! Eight parallel damped combs into four series allpasses per side, the right
//! side detuned by a fixed stereo spread. Mono buffers are run as a
//! duplicated stereo pair and averaged back down. Only the first two channels
//! of a wider buffer are touched.

use super::Effect;
use crate::utils::sanitize_sample;

const NUM_COMBS: usize = 8;
const NUM_ALLPASSES: usize = 4;

// Tunings in samples at 44.1 kHz
const COMB_TUNING: [usize; NUM_COMBS] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; NUM_ALLPASSES] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;

const FIXED_GAIN: f32 = 0.015;
const SCALE_WET: f32 = 3.0;
const SCALE_DRY: f32 = 2.0;
const SCALE_DAMP: f32 = 0.4;
const SCALE_ROOM: f32 = 0.28;
const OFFSET_ROOM: f32 = 0.7;
const ALLPASS_FEEDBACK: f32 = 0.5;

/// Freeze engages at or above this value
pub const FREEZE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damp1: f32,
    damp2: f32,
    filterstore: f32,
}

impl CombFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            feedback: 0.5,
            damp1: 0.2,
            damp2: 0.8,
            filterstore: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];

        self.filterstore = sanitize_sample(output * self.damp2 + self.filterstore * self.damp1);

        self.buffer[self.index] = input + self.filterstore * self.feedback;
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }

        output
    }

    fn set_damp(&mut self, damp: f32) {
        self.damp1 = damp;
        self.damp2 = 1.0 - damp;
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filterstore = 0.0;
    }
}

#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let bufout = self.buffer[self.index];
        let output = bufout - input;

        self.buffer[self.index] = sanitize_sample(input + bufout * ALLPASS_FEEDBACK);
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

/// Stereo reverb with Freeverb's parameter set
///
/// All parameters are 0-1. Freeze holds the current tail indefinitely by
/// muting the input and setting comb feedback to 1.
#[derive(Debug, Clone)]
pub struct Reverb {
    comb_l: Vec<CombFilter>,
    comb_r: Vec<CombFilter>,
    allpass_l: Vec<AllpassFilter>,
    allpass_r: Vec<AllpassFilter>,

    room_size: f32,
    damping: f32,
    wet_level: f32,
    dry_level: f32,
    width: f32,
    freeze: f32,

    // derived
    gain: f32,
    wet1: f32,
    wet2: f32,
    dry: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            comb_l: Vec::new(),
            comb_r: Vec::new(),
            allpass_l: Vec::new(),
            allpass_r: Vec::new(),
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.3,
            dry_level: 0.7,
            width: 1.0,
            freeze: 0.0,
            gain: FIXED_GAIN,
            wet1: 0.0,
            wet2: 0.0,
            dry: 0.0,
        };
        reverb.prepare(sample_rate);
        reverb
    }

    /// (Re)allocate the delay lines for `sample_rate` and clear them
    pub fn prepare(&mut self, sample_rate: f32) {
        let scale = sample_rate.max(1.0) / 44100.0;
        let size = |tuning: usize, spread: usize| ((tuning as f32) * scale) as usize + spread;

        self.comb_l = COMB_TUNING.iter().map(|&t| CombFilter::new(size(t, 0))).collect();
        self.comb_r = COMB_TUNING.iter().map(|&t| CombFilter::new(size(t, STEREO_SPREAD))).collect();
        self.allpass_l = ALLPASS_TUNING.iter().map(|&t| AllpassFilter::new(size(t, 0))).collect();
        self.allpass_r = ALLPASS_TUNING
            .iter()
            .map(|&t| AllpassFilter::new(size(t, STEREO_SPREAD)))
            .collect();

        self.update();
    }

    fn update(&mut self) {
        let wet = self.wet_level * SCALE_WET;
        self.wet1 = wet * (self.width / 2.0 + 0.5);
        self.wet2 = wet * ((1.0 - self.width) / 2.0);
        self.dry = self.dry_level * SCALE_DRY;

        let (feedback, damp, gain) = if self.is_frozen() {
            (1.0, 0.0, 0.0)
        } else {
            (
                self.room_size * SCALE_ROOM + OFFSET_ROOM,
                self.damping * SCALE_DAMP,
                FIXED_GAIN,
            )
        };

        self.gain = gain;
        for comb in self.comb_l.iter_mut().chain(self.comb_r.iter_mut()) {
            comb.feedback = feedback;
            comb.set_damp(damp);
        }
    }

    pub fn set_room_size(&mut self, value: f32) {
        self.room_size = value.clamp(0.0, 1.0);
        self.update();
    }

    pub fn set_damping(&mut self, value: f32) {
        self.damping = value.clamp(0.0, 1.0);
        self.update();
    }

    pub fn set_wet_level(&mut self, value: f32) {
        self.wet_level = value.clamp(0.0, 1.0);
        self.update();
    }

    pub fn set_dry_level(&mut self, value: f32) {
        self.dry_level = value.clamp(0.0, 1.0);
        self.update();
    }

    pub fn set_width(&mut self, value: f32) {
        self.width = value.clamp(0.0, 1.0);
        self.update();
    }

    /// Freeze is on for values >= 0.5
    pub fn set_freeze_mode(&mut self, value: f32) {
        self.freeze = value.clamp(0.0, 1.0);
        self.update();
    }

    /// Set room, damping, wet, dry and width together with a single update
    pub fn set_parameters(&mut self, room_size: f32, damping: f32, wet: f32, dry: f32, width: f32) {
        self.room_size = room_size.clamp(0.0, 1.0);
        self.damping = damping.clamp(0.0, 1.0);
        self.wet_level = wet.clamp(0.0, 1.0);
        self.dry_level = dry.clamp(0.0, 1.0);
        self.width = width.clamp(0.0, 1.0);
        self.update();
    }

    pub fn room_size(&self) -> f32 {
        self.room_size
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn wet_level(&self) -> f32 {
        self.wet_level
    }

    pub fn dry_level(&self) -> f32 {
        self.dry_level
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn freeze_mode(&self) -> f32 {
        self.freeze
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze >= FREEZE_THRESHOLD
    }

    /// Process one stereo frame
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let input = (left + right) * self.gain;

        let mut out_l = 0.0;
        let mut out_r = 0.0;
        for (comb_l, comb_r) in self.comb_l.iter_mut().zip(self.comb_r.iter_mut()) {
            out_l += comb_l.process(input);
            out_r += comb_r.process(input);
        }
        for (ap_l, ap_r) in self.allpass_l.iter_mut().zip(self.allpass_r.iter_mut()) {
            out_l = ap_l.process(out_l);
            out_r = ap_r.process(out_r);
        }

        (
            out_l * self.wet1 + out_r * self.wet2 + left * self.dry,
            out_r * self.wet1 + out_l * self.wet2 + right * self.dry,
        )
    }
}

impl Effect for Reverb {
    /// Mute every line
    fn reset(&mut self) {
        for comb in self.comb_l.iter_mut().chain(self.comb_r.iter_mut()) {
            comb.clear();
        }
        for allpass in self.allpass_l.iter_mut().chain(self.allpass_r.iter_mut()) {
            allpass.clear();
        }
    }

    /// Process 1 or 2 channels in place; extra channels are left alone
    fn process(&mut self, channels: &mut [&mut [f32]]) {
        match channels {
            [] => {}
            [mono] => {
                for sample in mono.iter_mut() {
                    let (l, r) = self.process_frame(*sample, *sample);
                    *sample = 0.5 * (l + r);
                }
            }
            [left, right, ..] => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let (out_l, out_r) = self.process_frame(*l, *r);
                    *l = out_l;
                    *r = out_r;
                }
            }
        }
    }
}
