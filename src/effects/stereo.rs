//! Stereo width and smart pan
//!
//! Both only act on stereo buffers; mono input passes through. Width and pan
//! amount are ticked once per frame so block-to-block changes glide.

use crate::utils::SmoothedParam;

/// Widths within this distance of 1.0 are treated as unity once settled
pub const WIDTH_EPSILON: f32 = 0.001;

/// Mid/side width. `width` is 0 (mono) to 2 (double side), 1 is unity.
pub fn apply_width(channels: &mut [&mut [f32]], width: &mut SmoothedParam) {
    let num_frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    if width.is_settled() && (width.get() - 1.0).abs() < WIDTH_EPSILON {
        return;
    }
    match channels {
        [left, right, ..] => {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                let w = width.tick().clamp(0.0, 2.0);
                let mid = (*l + *r) * 0.5;
                let side = (*l - *r) * 0.5 * w;
                *l = mid + side;
                *r = mid - side;
            }
        }
        _ => {
            width.advance(num_frames);
        }
    }
}

/// Cross-channel auto-pan on the shared LFO
///
/// The left channel follows `sin(phase)`, the right channel the same LFO a
/// half-cycle later. Whichever side is favoured takes a share of the other
/// channel's signal, and the other channel is attenuated by the same share,
/// so the sum `l + r` is preserved.
pub fn apply_smart_pan(channels: &mut [&mut [f32]], phases: &[f32], amount: &mut SmoothedParam) {
    let num_frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    if amount.is_settled() && amount.get() == 0.0 {
        return;
    }
    match channels {
        [left, right, ..] => {
            for ((l, r), &phase) in left.iter_mut().zip(right.iter_mut()).zip(phases) {
                let shift = amount.tick().min(1.0) * phase.sin();
                if shift > 0.0 {
                    let share = shift * 0.5;
                    *l += *r * share;
                    *r *= 1.0 - share;
                } else if shift < 0.0 {
                    let share = -shift * 0.5;
                    *r += *l * share;
                    *l *= 1.0 - share;
                }
            }
        }
        _ => {
            amount.advance(num_frames);
        }
    }
}
