use std::f32::consts::PI;

/// Lowest cutoff any stage accepts
pub const MIN_CUTOFF_HZ: f32 = 20.0;
/// Highest cutoff any stage accepts (further capped at 0.45 * sample rate)
pub const MAX_CUTOFF_HZ: f32 = 20000.0;

/// Which output of the filter core to use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    LowPass,
    /// Band-pass normalised to unity gain at the centre frequency
    BandPass,
    HighPass,
}

/// State Variable Filter (TPT/ZDF)
///
/// Topology-preserving transform form described by Andrew Simper. Stays
/// stable under per-block cutoff changes and near Nyquist, which the sweeps
/// and the vocoder's 12 kHz band rely on.
#[derive(Clone, Debug)]
pub struct StateVariableFilterTpt {
    sample_rate: f32,
    cutoff_freq: f32,
    resonance: f32, // Q factor

    g: f32,
    r: f32,
    h: f32,

    ic1eq: f32,
    ic2eq: f32,
}

impl StateVariableFilterTpt {
    pub fn new(sample_rate: f32, cutoff_freq: f32, resonance: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            cutoff_freq: Self::clamp_cutoff(cutoff_freq, sample_rate),
            resonance: resonance.max(0.5),
            g: 0.0,
            r: 0.0,
            h: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    fn clamp_cutoff(cutoff: f32, sample_rate: f32) -> f32 {
        let upper = MAX_CUTOFF_HZ.min(sample_rate * 0.45).max(MIN_CUTOFF_HZ);
        if cutoff.is_finite() {
            cutoff.clamp(MIN_CUTOFF_HZ, upper)
        } else {
            upper
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.cutoff_freq = Self::clamp_cutoff(self.cutoff_freq, sample_rate);
        self.update_coefficients();
        self.reset();
    }

    fn update_coefficients(&mut self) {
        let g = (PI * self.cutoff_freq / self.sample_rate).tan();
        let r = 1.0 / self.resonance;
        let h = 1.0 / (1.0 + r * g + g * g);

        self.g = g;
        self.r = r;
        self.h = h;
    }

    /// Run the core, returning (low, band, high). Band is the raw (peak = Q) output.
    #[inline]
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32) {
        let v1 = (self.g * (input - self.ic2eq) + self.ic1eq) * self.h;
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        let low = v2;
        let band = v1;
        let high = input - (self.r * v1 + v2);

        (low, band, high)
    }

    #[inline]
    pub fn process(&mut self, input: f32, mode: FilterMode) -> f32 {
        let (low, band, high) = self.process_all(input);
        match mode {
            FilterMode::LowPass => low,
            FilterMode::BandPass => band * self.r,
            FilterMode::HighPass => high,
        }
    }

    /// Update cutoff (clamped to 20 Hz - 20 kHz) and Q. Coefficients are only
    /// recomputed when a value actually moves.
    pub fn set_params(&mut self, cutoff_freq: f32, resonance: f32) {
        let new_cutoff = Self::clamp_cutoff(cutoff_freq, self.sample_rate);
        let new_res = if resonance.is_finite() { resonance.max(0.5) } else { 0.707 };
        if (new_cutoff - self.cutoff_freq).abs() > 0.001 || (new_res - self.resonance).abs() > 0.001
        {
            self.cutoff_freq = new_cutoff;
            self.resonance = new_res;
            self.update_coefficients();
        }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_freq
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// True when the integrators hold no energy
    pub fn is_clear(&self) -> bool {
        self.ic1eq == 0.0 && self.ic2eq == 0.0
    }
}
