//! Platform abstraction for audio output
//!
//! The demo binary feeds a test tone through the engine and plays the result
//! on the default output device. The [`TestTone`] source itself is platform
//! independent so it can be exercised without a sound card.

use std::f32::consts::TAU;

/// Trait for platform-specific audio output implementations
pub trait AudioOutput {
    /// Initialize the audio output with the given sample rate
    fn initialize(&mut self, sample_rate: f32) -> Result<(), anyhow::Error>;

    /// Start the audio stream
    fn start(&mut self) -> Result<(), anyhow::Error>;

    /// Stop the audio stream
    fn stop(&mut self) -> Result<(), anyhow::Error>;

    /// Get the current sample rate
    fn sample_rate(&self) -> f32;

    /// Check if the audio output is active
    fn is_active(&self) -> bool;
}

/// Sine test signal used as the engine's input
#[derive(Clone, Debug)]
pub struct TestTone {
    frequency: f32,
    amplitude: f32,
    sample_rate: f32,
    phase: f32,
}

impl TestTone {
    pub fn new(sample_rate: f32, frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
            sample_rate,
            phase: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = (TAU * self.phase).sin() * self.amplitude;
        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }

    /// Write the tone into every channel of an interleaved buffer
    pub fn fill_interleaved(&mut self, buffer: &mut [f32], num_channels: usize) {
        if num_channels == 0 {
            return;
        }
        for frame in buffer.chunks_mut(num_channels) {
            let value = self.next_sample();
            frame.fill(value);
        }
    }
}

// Platform-specific implementations
#[cfg(feature = "native")]
pub mod cpal_output;

#[cfg(feature = "native")]
pub use self::cpal_output::CpalOutput;
