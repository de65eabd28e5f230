//! Per-sample parameter smoothing
//!
//! Every control value that reaches the audio (build-up, wet mix, vocoder
//! gain, auto-gain, riser frequency) passes through a [`SmoothedParam`] so
//! automation never produces zipper noise.

/// Default smoothing time in milliseconds
pub const DEFAULT_SMOOTH_TIME_MS: f32 = 20.0;

/// Distance below which a smoother snaps onto its target
const SETTLE_EPSILON: f32 = 1e-6;

/// One-pole coefficient for a time constant given in milliseconds.
///
/// The smoother covers ~63% of the remaining distance after `time_ms`.
/// A non-positive time gives 1.0 (no smoothing).
pub fn one_pole_coeff(sample_rate: f32, time_ms: f32) -> f32 {
    if time_ms <= 0.0 || sample_rate <= 0.0 {
        return 1.0;
    }
    let samples = (time_ms / 1000.0) * sample_rate;
    1.0 - (-1.0 / samples).exp()
}

/// A smoothed value with range constraints
#[derive(Clone, Debug)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    /// One-pole coefficient (0-1, higher = faster)
    coeff: f32,
    settled: bool,
    pub min: f32,
    pub max: f32,
}

impl SmoothedParam {
    /// Create a new smoothed parameter with range
    ///
    /// # Arguments
    /// * `initial_value` - Starting value (will be clamped to range)
    /// * `min` - Minimum allowed value
    /// * `max` - Maximum allowed value
    /// * `sample_rate` - Rate at which `tick` is called, in Hz
    /// * `smooth_time_ms` - Time constant in milliseconds
    pub fn new(initial_value: f32, min: f32, max: f32, sample_rate: f32, smooth_time_ms: f32) -> Self {
        let clamped = initial_value.clamp(min, max);
        Self {
            current: clamped,
            target: clamped,
            coeff: one_pole_coeff(sample_rate, smooth_time_ms),
            settled: true,
            min,
            max,
        }
    }

    /// Set a new target value to smooth towards (clamped to range)
    pub fn set_target(&mut self, target: f32) {
        let clamped = target.clamp(self.min, self.max);
        if (self.target - clamped).abs() > 1e-8 {
            self.target = clamped;
            self.settled = false;
        }
    }

    /// Jump to a value without smoothing
    pub fn set_immediate(&mut self, value: f32) {
        let clamped = value.clamp(self.min, self.max);
        self.current = clamped;
        self.target = clamped;
        self.settled = true;
    }

    /// Advance one sample and return the smoothed value
    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.settled {
            return self.current;
        }

        let next = self.current + self.coeff * (self.target - self.current);
        self.step_to(next)
    }

    /// Advance `num_samples` samples in one step (block-rate use)
    pub fn advance(&mut self, num_samples: usize) -> f32 {
        if self.settled || num_samples == 0 {
            return self.current;
        }

        let span_coeff = 1.0 - (1.0 - self.coeff).powi(num_samples as i32);
        let next = self.current + span_coeff * (self.target - self.current);
        self.step_to(next)
    }

    /// Move to `next`, snapping onto the target once close enough or once
    /// the step is below f32 resolution and `current` would stop moving
    #[inline]
    fn step_to(&mut self, next: f32) -> f32 {
        if next == self.current || (next - self.target).abs() < SETTLE_EPSILON {
            self.current = self.target;
            self.settled = true;
        } else {
            self.current = next;
        }
        self.current
    }

    /// Current value without advancing
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Change the time constant, keeping the current value
    pub fn set_smooth_time(&mut self, sample_rate: f32, smooth_time_ms: f32) {
        self.coeff = one_pole_coeff(sample_rate, smooth_time_ms);
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 44100.0, DEFAULT_SMOOTH_TIME_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoother_reaches_target() {
        let mut smoother = SmoothedParam::new(0.0, 0.0, 1.0, 44100.0, 10.0);
        smoother.set_target(1.0);

        // 20 time constants
        for _ in 0..(44100 / 5) {
            smoother.tick();
        }

        assert!((smoother.get() - 1.0).abs() < 0.001, "Expected ~1.0, got {}", smoother.get());
        assert!(smoother.is_settled());
    }

    #[test]
    fn test_one_time_constant() {
        let mut smoother = SmoothedParam::new(0.0, 0.0, 1.0, 1000.0, 100.0);
        smoother.set_target(1.0);
        for _ in 0..100 {
            smoother.tick();
        }
        let v = smoother.get();
        assert!((v - 0.632).abs() < 0.01, "Expected ~63% after one time constant, got {}", v);
    }

    #[test]
    fn test_immediate_set() {
        let mut smoother = SmoothedParam::new(0.0, 0.0, 1.0, 44100.0, 10.0);
        smoother.set_immediate(1.0);

        assert_eq!(smoother.get(), 1.0);
        assert!(smoother.is_settled());
    }

    #[test]
    fn test_range_clamping() {
        let mut smoother = SmoothedParam::new(50.0, 20.0, 200.0, 44100.0, 10.0);

        smoother.set_target(300.0);
        assert_eq!(smoother.target(), 200.0);

        smoother.set_target(10.0);
        assert_eq!(smoother.target(), 20.0);
    }

    #[test]
    fn test_zero_time_is_instant() {
        assert_eq!(one_pole_coeff(44100.0, 0.0), 1.0);
        let mut smoother = SmoothedParam::new(0.0, 0.0, 1.0, 44100.0, 0.0);
        smoother.set_target(0.7);
        assert_eq!(smoother.tick(), 0.7);
    }

    #[test]
    fn test_advance_matches_ticks() {
        let mut a = SmoothedParam::new(0.0, 0.0, 100.0, 44100.0, 30.0);
        let mut b = a.clone();
        a.set_target(80.0);
        b.set_target(80.0);
        for _ in 0..256 {
            a.tick();
        }
        b.advance(256);
        assert!((a.get() - b.get()).abs() < 1e-3, "{} vs {}", a.get(), b.get());
    }

    #[test]
    fn test_slow_smoother_lands_exactly_on_unity() {
        // 3 s time constant: steps near 1.0 fall below f32 resolution
        let mut smoother = SmoothedParam::new(0.96, 0.0, 1.0, 44100.0, 3000.0);
        smoother.set_target(1.0);
        for _ in 0..(44100 * 30) {
            smoother.tick();
            if smoother.is_settled() {
                break;
            }
        }
        assert!(smoother.is_settled());
        assert_eq!(smoother.get(), 1.0);
    }

    #[test]
    fn test_advance_lands_exactly_on_target() {
        let mut smoother = SmoothedParam::new(0.0, 0.0, 1.0, 44100.0, 20.0);
        smoother.set_target(0.73);
        for _ in 0..2000 {
            smoother.advance(512);
        }
        assert!(smoother.is_settled());
        assert_eq!(smoother.get(), 0.73);
    }

    #[test]
    fn test_settled_value_is_exact() {
        let mut smoother = SmoothedParam::new(1.0, 0.0, 1.0, 44100.0, 5.0);
        for _ in 0..100 {
            assert_eq!(smoother.tick(), 1.0);
        }
    }
}
