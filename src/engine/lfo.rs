use std::f32::consts::TAU;

/// Shared modulation LFO for tremolo and smart pan
///
/// Phase is kept in radians, wrapped at 2π. It is never reset while the
/// engine runs, so tremolo and pan always resume from where they were.
pub struct Lfo {
    phase: f32,
    sample_rate: f32,
}

impl Lfo {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Current phase in radians (0 to 2π)
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset the phase to 0
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Advance one sample at `rate_hz`, returning the phase before the step
    #[inline]
    pub fn tick(&mut self, rate_hz: f32) -> f32 {
        let current = self.phase;
        self.phase += TAU * rate_hz / self.sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        current
    }

    /// Write one phase per frame into `phases`
    pub fn fill(&mut self, phases: &mut [f32], rate_hz: f32) {
        for phase in phases.iter_mut() {
            *phase = self.tick(rate_hz);
        }
    }
}
