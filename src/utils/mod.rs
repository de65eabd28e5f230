//! Shared helpers: parameter smoothing and logger setup

pub mod logging;
pub mod smoother;

pub use logging::init_logger;
pub use smoother::{one_pole_coeff, SmoothedParam, DEFAULT_SMOOTH_TIME_MS};

/// Values below this are flushed to zero in feedback paths
pub const DENORMAL_THRESHOLD: f32 = 1e-15;

/// Flush denormals and non-finite values to zero
#[inline]
pub fn sanitize_sample(x: f32) -> f32 {
    if x.is_finite() && x.abs() >= DENORMAL_THRESHOLD {
        x
    } else {
        0.0
    }
}
