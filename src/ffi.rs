//! C FFI bindings for the build-up engine
//!
//! This module exposes the engine to C/C++/Swift hosts via C-compatible
//! functions. Parameters are addressed by their index in storage order (see
//! the `BUILDUP_PARAM_*` constants) and take plain values (percent, Hz,
//! seconds, or a choice index).

use crate::engine::BuildUpEngine;
use crate::params::{ParamId, ParameterSet, PARAM_COUNT};
use crate::presets;
use std::slice;
use std::sync::Arc;

/// Opaque wrapper around the engine for FFI
///
/// Holds the shared parameter set next to the engine so control calls never
/// have to go through the engine itself.
pub struct BuildUpHandle {
    engine: BuildUpEngine,
    params: Arc<ParameterSet>,
}

// =============================================================================
// Parameter indices (storage order, must match the host's enum)
// =============================================================================

pub const BUILDUP_PARAM_BUILD_UP: u32 = 0;
pub const BUILDUP_PARAM_FILTER_INTENSITY: u32 = 1;
pub const BUILDUP_PARAM_FILTER_TYPE: u32 = 2;
pub const BUILDUP_PARAM_FILTER_SLOPE: u32 = 3;
pub const BUILDUP_PARAM_FILTER_RESONANCE: u32 = 4;
pub const BUILDUP_PARAM_FILTER_DRIVE: u32 = 5;
pub const BUILDUP_PARAM_REVERB_MIX: u32 = 6;
pub const BUILDUP_PARAM_NOISE_AMOUNT: u32 = 7;
pub const BUILDUP_PARAM_NOISE_TYPE: u32 = 8;
pub const BUILDUP_PARAM_VOCODER_RELEASE: u32 = 9;
pub const BUILDUP_PARAM_VOCODER_BRIGHTNESS: u32 = 10;
pub const BUILDUP_PARAM_TREMOLO_RATE: u32 = 11;
pub const BUILDUP_PARAM_TREMOLO_DEPTH: u32 = 12;
pub const BUILDUP_PARAM_RISER_AMOUNT: u32 = 13;
pub const BUILDUP_PARAM_RISER_TYPE: u32 = 14;
pub const BUILDUP_PARAM_RISER_RELEASE: u32 = 15;
pub const BUILDUP_PARAM_STEREO_WIDTH: u32 = 16;
pub const BUILDUP_PARAM_SMART_PAN: u32 = 17;
pub const BUILDUP_PARAM_NOISE_GATE: u32 = 18;
pub const BUILDUP_PARAM_AUTO_GAIN: u32 = 19;
pub const BUILDUP_PARAM_MACRO_MODE: u32 = 20;
pub const BUILDUP_PARAM_DELAY_MIX: u32 = 21;
pub const BUILDUP_PARAM_DELAY_TIME: u32 = 22;
pub const BUILDUP_PARAM_DELAY_FEEDBACK: u32 = 23;

// =============================================================================
// Reverb accessor indices
// =============================================================================

pub const BUILDUP_REVERB_ROOM_SIZE: u32 = 0;
pub const BUILDUP_REVERB_DAMPING: u32 = 1;
pub const BUILDUP_REVERB_WET_LEVEL: u32 = 2;
pub const BUILDUP_REVERB_DRY_LEVEL: u32 = 3;
pub const BUILDUP_REVERB_WIDTH: u32 = 4;
pub const BUILDUP_REVERB_FREEZE: u32 = 5;

/// Host tempo values at or below zero mean "no tempo available"
fn host_bpm(bpm: f32) -> Option<f32> {
    (bpm.is_finite() && bpm > 0.0).then_some(bpm)
}

// =============================================================================
// Engine lifecycle
// =============================================================================

/// Create a new engine prepared for `sample_rate` and `max_block_size`
///
/// # Returns
/// Pointer to a new engine. Must be freed with `buildup_engine_free`.
#[no_mangle]
pub extern "C" fn buildup_engine_new(sample_rate: f32, max_block_size: u32) -> *mut BuildUpHandle {
    let params = Arc::new(ParameterSet::new());
    let mut engine = BuildUpEngine::new(Arc::clone(&params));
    engine.prepare(sample_rate, max_block_size as usize);
    Box::into_raw(Box::new(BuildUpHandle { engine, params }))
}

/// Free an engine
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`, or null.
/// After calling this function, the pointer is invalid and must not be used.
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_free(engine: *mut BuildUpHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Re-prepare for a new sample rate or block size (allocates; not real-time safe)
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_prepare(engine: *mut BuildUpHandle, sample_rate: f32, max_block_size: u32) {
    if let Some(handle) = engine.as_mut() {
        handle.engine.prepare(sample_rate, max_block_size as usize);
    }
}

/// Clear all DSP state
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_reset(engine: *mut BuildUpHandle) {
    if let Some(handle) = engine.as_mut() {
        handle.engine.reset();
    }
}

// =============================================================================
// Audio processing
// =============================================================================

/// Process an interleaved buffer in place
///
/// # Arguments
/// * `buffer` - `frames * channels` interleaved floats
/// * `channels` - channel count; only the first two are processed
/// * `bpm` - host tempo, or 0 when unknown (120 is assumed)
///
/// # Safety
/// - `engine` must be a valid pointer returned by `buildup_engine_new`
/// - `buffer` must point to at least `frames * channels` floats
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_process_interleaved(
    engine: *mut BuildUpHandle,
    buffer: *mut f32,
    frames: u32,
    channels: u32,
    bpm: f32,
) {
    if engine.is_null() || buffer.is_null() || channels == 0 {
        return;
    }

    let handle = &mut *engine;
    let len = frames as usize * channels as usize;
    let buffer = slice::from_raw_parts_mut(buffer, len);
    handle.engine.process_interleaved(buffer, channels as usize, host_bpm(bpm));
}

/// Process separate left/right buffers in place. `right` may be null for mono.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `buildup_engine_new`
/// - `left` (and `right` when non-null) must point to at least `frames` floats
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_process_planar(
    engine: *mut BuildUpHandle,
    left: *mut f32,
    right: *mut f32,
    frames: u32,
    bpm: f32,
) {
    if engine.is_null() || left.is_null() {
        return;
    }

    let handle = &mut *engine;
    let left = slice::from_raw_parts_mut(left, frames as usize);
    if right.is_null() {
        handle.engine.process(&mut [left], host_bpm(bpm));
    } else {
        let right = slice::from_raw_parts_mut(right, frames as usize);
        handle.engine.process(&mut [left, right], host_bpm(bpm));
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// Set a parameter by index (plain value, clamped to the parameter's range)
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_set_param(engine: *mut BuildUpHandle, param: u32, value: f32) {
    let Some(handle) = engine.as_ref() else {
        return;
    };
    if let Some(id) = ParamId::from_index(param as usize) {
        handle.params.set(id, value);
    }
}

/// Get a parameter by index
///
/// # Returns
/// The plain value, or 0 for an unknown index or null engine
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_get_param(engine: *const BuildUpHandle, param: u32) -> f32 {
    match (engine.as_ref(), ParamId::from_index(param as usize)) {
        (Some(handle), Some(id)) => handle.params.get(id),
        _ => 0.0,
    }
}

/// Bitmask of parameters written by presets or macro automation since the
/// last call (bit n = parameter index n)
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_take_changed(engine: *const BuildUpHandle) -> u32 {
    match engine.as_ref() {
        Some(handle) => handle
            .params
            .take_changed()
            .iter()
            .fold(0u32, |mask, id| mask | (1 << id.index())),
        None => 0,
    }
}

/// Get the number of parameters
#[no_mangle]
pub extern "C" fn buildup_param_count() -> u32 {
    PARAM_COUNT as u32
}

// =============================================================================
// Presets
// =============================================================================

/// Load a factory preset into the parameters
///
/// # Returns
/// `true` on success, `false` for an out-of-range index or null engine
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_select_preset(engine: *mut BuildUpHandle, index: u32) -> bool {
    match engine.as_ref() {
        Some(handle) => presets::select(&handle.params, index as usize).is_ok(),
        None => false,
    }
}

/// Get the number of factory presets
#[no_mangle]
pub extern "C" fn buildup_preset_count() -> u32 {
    presets::count() as u32
}

// =============================================================================
// Reverb accessors
// =============================================================================

/// Set a reverb value (0-1). Freeze is on for values >= 0.5.
///
/// Room size, damping, wet, dry and width are re-derived from build-up on
/// every processed block; freeze persists until changed here.
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_set_reverb(engine: *mut BuildUpHandle, which: u32, value: f32) {
    let Some(handle) = engine.as_mut() else {
        return;
    };
    let reverb = handle.engine.reverb_mut();
    match which {
        BUILDUP_REVERB_ROOM_SIZE => reverb.set_room_size(value),
        BUILDUP_REVERB_DAMPING => reverb.set_damping(value),
        BUILDUP_REVERB_WET_LEVEL => reverb.set_wet_level(value),
        BUILDUP_REVERB_DRY_LEVEL => reverb.set_dry_level(value),
        BUILDUP_REVERB_WIDTH => reverb.set_width(value),
        BUILDUP_REVERB_FREEZE => reverb.set_freeze_mode(value),
        _ => {} // Unknown accessor, ignore
    }
}

/// Get a reverb value, or 0 for an unknown accessor or null engine
///
/// # Safety
/// `engine` must be a valid pointer returned by `buildup_engine_new`
#[no_mangle]
pub unsafe extern "C" fn buildup_engine_get_reverb(engine: *const BuildUpHandle, which: u32) -> f32 {
    let Some(handle) = engine.as_ref() else {
        return 0.0;
    };
    let reverb = handle.engine.reverb();
    match which {
        BUILDUP_REVERB_ROOM_SIZE => reverb.room_size(),
        BUILDUP_REVERB_DAMPING => reverb.damping(),
        BUILDUP_REVERB_WET_LEVEL => reverb.wet_level(),
        BUILDUP_REVERB_DRY_LEVEL => reverb.dry_level(),
        BUILDUP_REVERB_WIDTH => reverb.width(),
        BUILDUP_REVERB_FREEZE => reverb.freeze_mode(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_indices_match_storage_order() {
        assert_eq!(ParamId::from_index(BUILDUP_PARAM_BUILD_UP as usize), Some(ParamId::BuildUp));
        assert_eq!(ParamId::from_index(BUILDUP_PARAM_SMART_PAN as usize), Some(ParamId::SmartPan));
        assert_eq!(
            ParamId::from_index(BUILDUP_PARAM_DELAY_FEEDBACK as usize),
            Some(ParamId::DelayFeedback)
        );
        assert_eq!(buildup_param_count(), 24);
    }

    #[test]
    fn test_host_bpm() {
        assert_eq!(host_bpm(0.0), None);
        assert_eq!(host_bpm(f32::NAN), None);
        assert_eq!(host_bpm(128.0), Some(128.0));
    }
}
