pub mod delay;
pub mod reverb;
pub mod soft_saturation;
pub mod stereo;
pub mod tremolo;
pub mod vocoder;

pub use self::delay::{DelaySettings, TempoDelay};
pub use self::reverb::Reverb;
pub use self::stereo::{apply_smart_pan, apply_width};
pub use self::tremolo::apply_tremolo;
pub use self::vocoder::{Vocoder, VocoderSettings};

/// Trait for the in-place block processors of the chain
/// Send is required because processors live on the audio thread
pub trait Effect: Send {
    /// Process 1 or 2 planar channels in place
    fn process(&mut self, channels: &mut [&mut [f32]]);

    /// Clear all internal state without reallocating
    fn reset(&mut self);
}
