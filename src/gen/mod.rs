pub mod noise;
pub mod riser;

pub use self::noise::NoiseSource;
pub use self::riser::{Riser, RiserSettings};
