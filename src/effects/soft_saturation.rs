//! Soft saturation curves
//!
//! `soft_saturate` is the musicdsp.org waveshaper by Bram de Jong (2002). It
//! drives the filter stage when `filterDrive` is up. The delay feedback path
//! uses a plain `tanh` clip instead.

/// Drive amounts below this leave the signal untouched
pub const DRIVE_EPSILON: f32 = 0.001;

/// Soft saturation with threshold `a` (0-1)
///
/// Three regions:
/// - linear below `a`
/// - soft curve `a + (x-a)/(1+((x-a)/(1-a))^2)` up to 1
/// - hard limit at `(a+1)/2` above 1
///
/// Output is scaled by `2/(a+1)` so a full-scale input stays at full scale.
/// `a >= 1` is an exact bypass.
#[inline]
pub fn soft_saturate(x: f32, a: f32) -> f32 {
    if a >= 1.0 {
        return x;
    }
    let a = a.max(0.0);

    let sign = x.signum();
    let abs_x = x.abs();

    let saturated = if abs_x < a {
        abs_x
    } else if abs_x <= 1.0 {
        let x_minus_a = abs_x - a;
        let ratio = x_minus_a / (1.0 - a);
        a + x_minus_a / (1.0 + ratio * ratio)
    } else {
        (a + 1.0) / 2.0
    };

    sign * saturated * (2.0 / (a + 1.0))
}

/// Filter drive: push the signal into `soft_saturate` with a gain that rises
/// with `amount` (0-1), then compensate part of that gain.
#[inline]
pub fn drive(x: f32, amount: f32) -> f32 {
    if amount < DRIVE_EPSILON {
        return x;
    }
    let amount = amount.min(1.0);
    let gain = 1.0 + 4.0 * amount;
    let threshold = 1.0 - 0.7 * amount;
    soft_saturate(x * gain, threshold) / gain.sqrt()
}

/// Feedback clip for the delay line
#[inline]
pub fn tanh_clip(x: f32) -> f32 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_at_max_threshold() {
        assert_eq!(soft_saturate(0.5, 1.0), 0.5);
        assert_eq!(soft_saturate(-0.3, 1.0), -0.3);
        assert_eq!(soft_saturate(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_soft_limiting() {
        let output = soft_saturate(2.0, 0.0);
        assert!(output < 2.0, "Saturation should reduce amplitude");
        assert!(output > 0.0, "Output should be positive for positive input");
    }

    #[test]
    fn test_symmetry() {
        let positive = soft_saturate(0.7, 0.5);
        let negative = soft_saturate(-0.7, 0.5);
        assert!((positive + negative).abs() < 1e-6, "Should be antisymmetric");
    }

    #[test]
    fn test_linear_region() {
        let output = soft_saturate(0.3, 0.5);
        let expected = 0.3 * (2.0 / 1.5);
        assert!((output - expected).abs() < 1e-6);
    }

    #[test]
    fn test_zero_drive_is_exact() {
        for x in [-1.0, -0.25, 0.0, 0.1, 0.9] {
            assert_eq!(drive(x, 0.0), x);
        }
    }

    #[test]
    fn test_full_drive_is_bounded() {
        for i in -100..=100 {
            let x = i as f32 * 0.05;
            let y = drive(x, 1.0);
            assert!(y.is_finite() && y.abs() <= 1.0, "drive({}) = {}", x, y);
        }
    }

    #[test]
    fn test_tanh_clip_bounds_feedback() {
        assert!(tanh_clip(50.0) <= 1.0);
        assert!(tanh_clip(-50.0) >= -1.0);
    }
}
