//! Real-time build-up effects engine
//!
//! One master "build-up" control drives a chain of filter sweep, noise
//! vocoder, reverb, riser synthesis, tremolo, stereo processing and a
//! tempo-synced delay. Hosts write parameters into a shared
//! [`params::ParameterSet`] and call [`engine::BuildUpEngine::process`] once
//! per audio block.

pub mod effects;
pub mod engine;
pub mod envelope;
pub mod filters;
pub mod gen;
pub mod params;
pub mod presets;
pub mod utils;

// C ABI for native hosts
pub mod ffi;

// Platform abstraction layer
pub mod platform;

pub use engine::BuildUpEngine;
pub use params::{ParamError, ParamId, ParamSnapshot, ParameterSet};
