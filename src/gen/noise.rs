//! Noise sources: white, pink and vinyl crackle
//!
//! Each source owns its own seeded `SmallRng`, so two engine instances never
//! share generator state.

use crate::params::NoiseType;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Level of the economy pink filter output relative to white noise
const PINK_GAIN: f32 = 0.5;
/// Probability per sample of a crackle impulse
const CRACKLE_DENSITY: f32 = 0.02;

pub struct NoiseSource {
    rng: SmallRng,
    seed: u64,
    // Paul Kellet's three-pole economy pink filter
    pink_state: [f32; 3],
}

impl NoiseSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            seed,
            pink_state: [0.0; 3],
        }
    }

    /// Restart the sequence from the original seed and clear filter state
    pub fn reset(&mut self) {
        self.rng = SmallRng::seed_from_u64(self.seed);
        self.pink_state = [0.0; 3];
    }

    /// Uniform white noise in [-1, 1)
    #[inline]
    pub fn white(&mut self) -> f32 {
        self.rng.gen::<f32>() * 2.0 - 1.0
    }

    /// Pink (-3 dB/oct) noise
    #[inline]
    pub fn pink(&mut self) -> f32 {
        let white = self.white();
        let s = &mut self.pink_state;
        s[0] = 0.99886 * s[0] + white * 0.0555179;
        s[1] = 0.99332 * s[1] + white * 0.0750759;
        s[2] = 0.96900 * s[2] + white * 0.1538520;
        (s[0] + s[1] + s[2] + white * 0.5362) * PINK_GAIN
    }

    /// Low hiss with sparse loud clicks
    #[inline]
    pub fn crackle(&mut self) -> f32 {
        let scale = if self.rng.gen::<f32>() < CRACKLE_DENSITY {
            3.0
        } else {
            0.3
        };
        self.white() * scale
    }

    #[inline]
    pub fn next(&mut self, kind: NoiseType) -> f32 {
        match kind {
            NoiseType::White => self.white(),
            NoiseType::Pink => self.pink(),
            NoiseType::Vinyl => self.crackle(),
        }
    }
}
